use std::io;

/// Alias for `Result<T, ArchiveError>`.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Possible errors while decoding a packaged document.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// The central directory cannot be parsed.
    ///
    /// Fatal for the load attempt; nothing from the archive is retained.
    #[error("[CorruptArchive]: {source}")]
    CorruptArchive {
        /// The root cause of the error.
        source: zip::result::ZipError,
    },

    /// A single entry cannot be decompressed, due to a checksum mismatch,
    /// a broken stream, or an unsupported compression method.
    ///
    /// Only the affected entry is skipped; the remaining entries still decode.
    #[error("[DecompressionError - `{path}`]: {source}")]
    Decompression {
        /// The root cause of the error.
        source: io::Error,
        /// The archive path of the entry responsible for triggering the error.
        path: String,
    },
}

impl ArchiveError {
    pub(super) fn decompression(path: &str, source: impl Into<io::Error>) -> Self {
        Self::Decompression {
            source: source.into(),
            path: path.to_owned(),
        }
    }
}
