//! Decoding of the zip container a packaged document ships in.
//!
//! Decoding is purely computational: everything operates on the bytes handed over.

pub(crate) mod errors;
mod zip;

pub use self::errors::{ArchiveError, ArchiveResult};
pub use self::zip::ArchiveDecoder;
use std::fmt::{Display, Formatter};

/// One physical file recorded in the archive's central directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub(crate) index: usize,
    pub(crate) path: String,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
    pub(crate) compression: EntryCompression,
}

impl ArchiveEntry {
    /// The archive-relative, slash-separated path.
    ///
    /// Degenerate paths (empty, or without an extension) are preserved as-is.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The declared size of the entry as stored within the archive.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// The declared size of the entry once decompressed.
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// How the entry's data is compressed.
    pub fn compression(&self) -> &EntryCompression {
        &self.compression
    }
}

/// Compression method of an [`ArchiveEntry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryCompression {
    /// Uncompressed.
    Stored,
    /// Deflate compressed.
    Deflated,
    /// Any other method, named by the archive library.
    ///
    /// Reading such an entry fails with [`ArchiveError::Decompression`].
    Unsupported(String),
}

impl EntryCompression {
    /// Returns `true` if the entry can be decompressed.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl Display for EntryCompression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => f.write_str("stored"),
            Self::Deflated => f.write_str("deflated"),
            Self::Unsupported(method) => write!(f, "unsupported ({method})"),
        }
    }
}

/// An entry together with its decompressed content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedEntry {
    /// The entry the payload was read from.
    pub entry: ArchiveEntry,
    /// The raw, decompressed bytes.
    pub payload: Vec<u8>,
}

/// Lists every file entry of the archive contained in `bytes`.
///
/// # Errors
/// [`ArchiveError::CorruptArchive`] when the central directory cannot be parsed.
pub fn list_entries(bytes: &[u8]) -> ArchiveResult<Vec<ArchiveEntry>> {
    ArchiveDecoder::new(bytes).map(|decoder| decoder.entries().to_vec())
}

/// Reads the decompressed content of `entry` from the archive contained in `bytes`.
///
/// `entry` must originate from [`list_entries`] over the same bytes.
///
/// # Errors
/// - [`ArchiveError::CorruptArchive`] when the central directory cannot be parsed.
/// - [`ArchiveError::Decompression`] on checksum, stream, or unsupported method failure.
pub fn read_entry(bytes: &[u8], entry: &ArchiveEntry) -> ArchiveResult<Vec<u8>> {
    ArchiveDecoder::new(bytes)?.read_entry(entry)
}
