//! Error-related types for a [`Reader`](crate::Reader) and its pipeline stages.

pub use crate::archive::{ArchiveError, ArchiveResult};
pub use crate::fetch::{FetchError, FetchResult};
pub use crate::manifest::ManifestError;
pub use crate::publish::PublishError;
pub use crate::util::utf::UtfError;

/// Alias for `Result<T, ReaderError>`.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Unified error type.
/// Possible errors of one load attempt.
///
/// # Variants
/// ## Fatal before publishing
/// The previously published generation keeps being served.
/// - [`Archive`](ReaderError::Archive)
/// - [`Publish`](ReaderError::Publish)
/// ## After publishing
/// - [`ManifestUnavailable`](ReaderError::ManifestUnavailable)
/// - [`ContentFetch`](ReaderError::ContentFetch): the partially composed surface is kept.
/// - [`Superseded`](ReaderError::Superseded): a newer load request took over.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    /// The archive itself cannot be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The decoded entries cannot be published as one consistent generation.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The control documents cannot be resolved into a manifest.
    #[error("[ManifestUnavailable]: {0}")]
    ManifestUnavailable(#[from] ManifestError),

    /// A spine document cannot be fetched; composition was aborted.
    #[error("[ContentFetch - `{href}`]: {source}")]
    ContentFetch {
        /// The root cause of the error.
        source: FetchError,
        /// The spine href as declared by the package document.
        href: String,
    },

    /// A newer load request replaced this one before it completed.
    #[error("[Superseded]: A newer load request replaced this one")]
    Superseded,
}
