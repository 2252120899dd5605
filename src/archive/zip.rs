use crate::archive::errors::{ArchiveError, ArchiveResult};
use crate::archive::{ArchiveEntry, DecodedEntry, EntryCompression};
use ::zip::CompressionMethod;
use ::zip::ZipArchive as Zip;
use std::io::{self, Cursor, Read};
use tracing::{debug, warn};

/// Decoder over an in-memory archive whose central directory has been parsed once.
///
/// # Examples
/// ```no_run
/// # use scroll_reader::archive::ArchiveDecoder;
/// # fn main() -> scroll_reader::archive::ArchiveResult<()> {
/// let bytes = std::fs::read("book.epub").unwrap();
/// let mut decoder = ArchiveDecoder::new(&bytes)?;
///
/// for entry in decoder.entries().to_vec() {
///     let payload = decoder.read_entry(&entry)?;
///     println!("{}: {} bytes", entry.path(), payload.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ArchiveDecoder<'a> {
    zip: Zip<Cursor<&'a [u8]>>,
    entries: Vec<ArchiveEntry>,
}

impl<'a> ArchiveDecoder<'a> {
    /// Parses the central directory of the archive in `bytes`.
    ///
    /// # Errors
    /// [`ArchiveError::CorruptArchive`] when the central directory cannot be parsed.
    pub fn new(bytes: &'a [u8]) -> ArchiveResult<Self> {
        let mut zip = Zip::new(Cursor::new(bytes))
            .map_err(|source| ArchiveError::CorruptArchive { source })?;
        let mut entries = Vec::with_capacity(zip.len());

        for index in 0..zip.len() {
            let file = zip
                .by_index_raw(index)
                .map_err(|source| ArchiveError::CorruptArchive { source })?;

            // Directory records carry no content
            if file.is_dir() {
                continue;
            }
            entries.push(ArchiveEntry {
                index,
                path: file.name().to_owned(),
                compressed_size: file.compressed_size(),
                uncompressed_size: file.size(),
                compression: compression_of(file.compression()),
            });
        }

        debug!(entries = entries.len(), "parsed archive central directory");
        Ok(Self { zip, entries })
    }

    /// Every file entry in central directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Reads the decompressed bytes of `entry`, verifying its checksum.
    ///
    /// # Errors
    /// [`ArchiveError::Decompression`] on checksum, stream, or unsupported method failure.
    pub fn read_entry(&mut self, entry: &ArchiveEntry) -> ArchiveResult<Vec<u8>> {
        if let EntryCompression::Unsupported(method) = &entry.compression {
            return Err(ArchiveError::decompression(
                &entry.path,
                io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported compression method: {method}"),
                ),
            ));
        }
        let mut file = self
            .zip
            .by_index(entry.index)
            .map_err(|error| ArchiveError::decompression(&entry.path, error))?;

        // The declared size is only a hint; the stream decides.
        let capacity = usize::try_from(entry.uncompressed_size).unwrap_or_default();
        let mut buf = Vec::with_capacity(capacity.min(64 * 1024 * 1024));

        file.read_to_end(&mut buf)
            .map(|_| buf)
            .map_err(|error| ArchiveError::decompression(&entry.path, error))
    }

    /// Decodes every entry.
    ///
    /// Entries that fail to decompress are logged and returned separately
    /// instead of aborting the remaining entries.
    pub fn decode_all(&mut self) -> (Vec<DecodedEntry>, Vec<ArchiveError>) {
        let mut decoded = Vec::with_capacity(self.entries.len());
        let mut failed = Vec::new();

        for entry in std::mem::take(&mut self.entries) {
            match self.read_entry(&entry) {
                Ok(payload) => decoded.push(DecodedEntry {
                    entry: entry.clone(),
                    payload,
                }),
                Err(error) => {
                    warn!(%error, "skipping undecodable archive entry");
                    failed.push(error);
                }
            }
            self.entries.push(entry);
        }
        (decoded, failed)
    }
}

fn compression_of(method: CompressionMethod) -> EntryCompression {
    match method {
        CompressionMethod::Stored => EntryCompression::Stored,
        CompressionMethod::Deflated => EntryCompression::Deflated,
        other => EntryCompression::Unsupported(format!("{other:?}")),
    }
}
