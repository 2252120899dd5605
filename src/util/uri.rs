use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Directory portion of a reader-relative path (`text/ch1.xhtml` -> `text`).
pub(crate) fn parent(path: &str) -> &str {
    path.rfind('/')
        .map_or("", |index| if index == 0 { "/" } else { &path[..index] })
}

pub(crate) fn decode(encoded: &str) -> Cow<'_, str> {
    percent_encoding::percent_decode_str(encoded).decode_utf8_lossy()
}

/// Splits `href` into its main part and a trailing `?query`/`#fragment`, if any.
pub(crate) fn split_suffix(href: &str) -> (&str, &str) {
    href.find(['?', '#'])
        .map(|position| (&href[..position], &href[position..]))
        .unwrap_or((href, ""))
}

/// Splits `href` at `#`, returning the fragment without its marker.
pub(crate) fn split_fragment(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((main, fragment)) => (main, Some(fragment)),
        None => (href, None),
    }
}

/// `true` when `href` carries a scheme (`data:`, `https:`), making it
/// independent of any published resource.
pub(crate) fn has_scheme(href: &str) -> bool {
    let (main, _) = split_suffix(href);
    main.find(':').is_some_and(|colon| {
        let scheme = &main[..colon];
        !scheme.is_empty()
            && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Resolve a reference found in a document living in `parent_dir`
/// into a reader-relative, percent-decoded path.
///
/// The query and fragment are dropped: published resources are keyed by path only.
/// References carrying a scheme are returned untouched.
pub(crate) fn resolve<'a>(parent_dir: &str, relative: &'a str) -> Cow<'a, str> {
    if has_scheme(relative) {
        return Cow::Borrowed(relative);
    }
    let (main_href, _) = split_suffix(relative);
    let main_href = decode(main_href);

    // A leading `/` addresses the reader root rather than the filesystem root.
    let mut buf = match main_href.strip_prefix('/') {
        Some(rooted) => PathBuf::from(rooted),
        None => Path::new(parent_dir).join(main_href.as_ref()),
    };
    normalize_path(&mut buf);

    // 1: `buf` is UTF-8 as its data derives from `parent_dir` and `relative`.
    // 2: Ensure separators are forward slashes.
    Cow::Owned(buf.to_string_lossy().replace('\\', "/"))
}

fn normalize_path(original: &mut PathBuf) {
    let mut stack = Vec::new();

    for component in original.components() {
        match component {
            // Climbing above the reader root is clamped at the root.
            Component::ParentDir => {
                stack.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::Normal(_) => stack.push(component),
        }
    }

    *original = PathBuf::from_iter(stack);
}
