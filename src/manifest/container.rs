use crate::manifest::{ContainerPointer, ManifestError, consts};
use crate::parser::xml::{self, XmlElement, XmlReader};
use quick_xml::events::Event;

/// Parses `META-INF/container.xml` and retrieves the package document location.
///
/// Although rare, multiple `rootfile` elements could exist;
/// only the first one carrying a `full-path` is accepted as it is the default rendition.
pub(super) fn parse_container(data: &str) -> Result<ContainerPointer, ManifestError> {
    let mut reader = xml::strict_reader(data.as_bytes());

    while let Some(event) = reader.next() {
        let event = event.map_err(|source| ManifestError::Unparsable {
            path: consts::CONTAINER.to_owned(),
            source,
        })?;
        let el = match event {
            Event::Start(el) | Event::Empty(el) if el.is_local_name(consts::ROOT_FILE) => el,
            _ => continue,
        };
        if let Some(full_path) = el.get_attribute(consts::FULL_PATH) {
            return Ok(ContainerPointer {
                rootfile_path: full_path,
            });
        }
    }
    Err(ManifestError::NoRootfile)
}
