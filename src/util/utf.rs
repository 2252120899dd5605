use std::string::{FromUtf8Error, FromUtf16Error};
use thiserror::Error;

/// Why a fetched body could not be read as text.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UtfError {
    /// A UTF-16 byte order mark was present but the remaining data has an odd length.
    #[error("UTF-16 data needs to contain an even amount of bytes")]
    UnevenByteCount,
    /// Invalid UTF-8 data.
    #[error(transparent)]
    InvalidUtf8(FromUtf8Error),
    /// Invalid UTF-16 data.
    #[error(transparent)]
    InvalidUtf16(FromUtf16Error),
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes a resource body into text, honoring UTF-8 and UTF-16 byte order marks.
///
/// Data without a BOM is treated as UTF-8.
pub(crate) fn decode_text(data: &[u8]) -> Result<String, UtfError> {
    if is_utf16(data) {
        from_utf16(data)
    } else {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        String::from_utf8(data.to_vec()).map_err(UtfError::InvalidUtf8)
    }
}

fn is_utf16(data: &[u8]) -> bool {
    data.starts_with(b"\xFF\xFE") || data.starts_with(b"\xFE\xFF")
}

fn from_utf16(data: &[u8]) -> Result<String, UtfError> {
    let endian = if data.starts_with(b"\xFF") {
        u16::from_le_bytes
    } else {
        u16::from_be_bytes
    };

    let utf16 = data[2..]
        .chunks(2)
        .map(|chunk| chunk.try_into().map(endian))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| UtfError::UnevenByteCount)?;

    String::from_utf16(&utf16).map_err(UtfError::InvalidUtf16)
}
