use crate::util::StringExt;
use quick_xml::Reader;
use quick_xml::escape;
use quick_xml::events::{BytesCData, BytesRef, BytesStart, BytesText, Event};
use std::borrow::Cow;

pub(crate) type ByteReader<'a> = Reader<&'a [u8]>;
pub(crate) type XmlResult<T> = Result<T, quick_xml::Error>;

/// Creates a reader over well-formed XML, such as the control documents.
pub(crate) fn strict_reader(data: &[u8]) -> ByteReader<'_> {
    Reader::from_reader(data)
}

/// Creates a reader that tolerates mismatched end tags,
/// for scanning content documents authored as loose (X)HTML.
pub(crate) fn lenient_reader(data: &[u8]) -> ByteReader<'_> {
    let mut reader = Reader::from_reader(data);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

pub(crate) trait XmlReader<'a> {
    /// Iterator-like method to read the next [`Event`].
    fn next(&mut self) -> Option<XmlResult<Event<'a>>>;

    /// Retrieve consolidated text for a specified element up to its end tag.
    fn get_text_simple(&mut self, start: &BytesStart) -> XmlResult<String> {
        let mut value = String::new();
        let mut depth = 0usize;

        while let Some(result) = self.next() {
            match result? {
                Event::Start(el) if el.name() == start.name() => depth += 1,
                Event::End(el) if el.name() == start.name() => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Event::Text(text) => text_to_str(&mut value, &text),
                Event::CData(cdata) => cdata_to_str(&mut value, &cdata),
                Event::GeneralRef(reference) => reference_to_str(&mut value, &reference),
                _ => {}
            }
        }
        value.trim_in_place();
        Ok(value)
    }
}

impl<'a> XmlReader<'a> for ByteReader<'a> {
    fn next(&mut self) -> Option<XmlResult<Event<'a>>> {
        match self.read_event() {
            Ok(Event::Eof) => None,
            result => Some(result),
        }
    }
}

pub(crate) trait XmlElement {
    fn is_local_name(&self, local_name: impl AsRef<[u8]>) -> bool;

    /// Retrieves an attribute by its qualified name, unescaping its value.
    ///
    /// Attributes that fail to parse are treated as absent.
    fn get_attribute(&self, key: impl AsRef<[u8]>) -> Option<String>;
}

impl XmlElement for BytesStart<'_> {
    fn is_local_name(&self, target_local_name: impl AsRef<[u8]>) -> bool {
        self.local_name().as_ref() == target_local_name.as_ref()
    }

    fn get_attribute(&self, key: impl AsRef<[u8]>) -> Option<String> {
        let attribute = self.try_get_attribute(key).ok()??;
        let raw = String::from_utf8_lossy(&attribute.value);

        Some(match escape::unescape(&raw) {
            Ok(unescaped) => unescaped.into_owned(),
            Err(_) => raw.into_owned(),
        })
    }
}

// Helper methods
fn text_to_str(value: &mut String, text: &BytesText) {
    let raw = String::from_utf8_lossy(text.as_ref());
    match escape::unescape(&raw) {
        Ok(unescaped) => value.push_str(&unescaped),
        Err(_) => value.push_str(&raw),
    }
}

fn cdata_to_str(value: &mut String, cdata: &BytesCData) {
    value.push_str(&String::from_utf8_lossy(cdata.as_ref()));
}

fn reference_to_str(value: &mut String, reference: &BytesRef) {
    let entity = format!("&{};", String::from_utf8_lossy(reference.as_ref()));
    let resolved = escape::unescape(&entity).unwrap_or(Cow::Borrowed(entity.as_str()));
    value.push_str(&resolved);
}
