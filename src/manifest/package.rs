use crate::manifest::{ManifestError, PackageManifest, SpineItem, consts};
use crate::parser::xml::{self, XmlElement, XmlReader};
use crate::publish::mime;
use crate::util::uri;
use quick_xml::events::Event;
use tracing::warn;

/// Parses the package document published at `package_path`.
///
/// Every manifest `item` declaring the XHTML media type becomes a spine entry,
/// in document order. Hrefs are resolved against the package document's directory.
pub(super) fn parse_package(data: &str, package_path: &str) -> Result<PackageManifest, ManifestError> {
    let unparsable = |source| ManifestError::Unparsable {
        path: package_path.to_owned(),
        source,
    };
    let package_dir = uri::parent(package_path);
    let mut reader = xml::strict_reader(data.as_bytes());
    let mut language = None;
    let mut spine = Vec::new();

    while let Some(event) = reader.next() {
        match event.map_err(unparsable)? {
            Event::Start(el) if language.is_none() && el.is_local_name(consts::LANGUAGE) => {
                language = Some(reader.get_text_simple(&el).map_err(unparsable)?);
            }
            Event::Start(el) | Event::Empty(el) if el.is_local_name(consts::ITEM) => {
                let is_xhtml = el
                    .get_attribute(consts::MEDIA_TYPE)
                    .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(mime::XHTML));
                if !is_xhtml {
                    continue;
                }
                match el.get_attribute(consts::HREF) {
                    Some(href) => spine.push(SpineItem {
                        path: uri::resolve(package_dir, &href).into_owned(),
                        href,
                    }),
                    None => warn!(package_path, "skipping xhtml manifest item without an href"),
                }
            }
            _ => {}
        }
    }

    let language = language.unwrap_or_else(|| {
        warn!(package_path, "package document declares no language");
        String::new()
    });

    Ok(PackageManifest {
        package_path: package_path.to_owned(),
        language,
        spine,
        generation: None,
    })
}
