//! Content types served for published resources, derived from file extensions.

pub(crate) const XHTML: &str = "application/xhtml+xml";
pub(crate) const PLAIN_TEXT: &str = "text/plain";

#[rustfmt::skip]
const EXTENSIONS: &[(&str, &str)] = &[
    ("html", XHTML),
    ("xhtml", XHTML),
    ("htm", XHTML),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("txt", PLAIN_TEXT),
    ("xml", "application/xml"),
    ("opf", "application/oebps-package+xml"),
    ("ncx", "application/x-dtbncx+xml"),
    ("epub", "application/epub+zip"),
    ("ttf", "font/ttf"),
    ("ttc", "font/collection"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
    ("sfnt", "application/font-sfnt"),
];

/// The extension of the final path segment, without its dot.
///
/// Returns [`None`] when the file name has no dot, ends with one,
/// or only starts with one (`.hidden`).
pub(crate) fn extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);

    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => Some(extension),
        _ => None,
    }
}

/// Resolves the content type served for `path`.
///
/// Unknown or absent extensions fall back to `text/plain`.
pub fn content_type_for(path: &str) -> &'static str {
    extension(path)
        .and_then(|extension| {
            EXTENSIONS
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        })
        .map_or(PLAIN_TEXT, |&(_, content_type)| content_type)
}
