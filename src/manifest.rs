//! Resolution of the packaging format's control documents into a reading order.
//!
//! Both control documents are read back through the published-resource surface,
//! exactly as the composed document would reference them.

mod container;
mod package;

use crate::fetch::{self, FetchError, ResourceFetcher};
use crate::publish::{self, Generation, ResourceStore};
use crate::session::ReaderSettings;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub(crate) mod consts {
    // Paths
    pub(crate) const CONTAINER: &str = "META-INF/container.xml";

    // Elements
    pub(crate) const ROOT_FILE: &str = "rootfile";
    pub(crate) const LANGUAGE: &str = "language";
    pub(crate) const ITEM: &str = "item";

    // Attributes
    pub(crate) const FULL_PATH: &str = "full-path";
    pub(crate) const MEDIA_TYPE: &str = "media-type";
    pub(crate) const HREF: &str = "href";
}

/// Possible reasons no manifest is available for a load attempt.
///
/// None of these are retried automatically.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The container pointer document is not served; no archive has been loaded yet.
    #[error("[NotLoaded]: `META-INF/container.xml` is not served")]
    NotLoaded {
        /// The root cause of the error.
        source: FetchError,
    },

    /// The container pointer document is served but empty.
    #[error("[EmptyContainer]: `META-INF/container.xml` has no content")]
    EmptyContainer,

    /// A control document could not be retrieved or read.
    #[error("[Fetch - `{path}`]: {source}")]
    Fetch {
        /// The root cause of the error.
        source: FetchError,
        /// The reader-relative path of the control document.
        path: String,
    },

    /// A control document is not well-formed XML.
    #[error("[Unparsable - `{path}`]: {source}")]
    Unparsable {
        /// The root cause of the error.
        source: quick_xml::Error,
        /// The reader-relative path of the control document.
        path: String,
    },

    /// The container pointer document references no package document.
    #[error("Missing `rootfile` element with a `full-path` in `META-INF/container.xml`")]
    NoRootfile,
}

impl ManifestError {
    /// Returns `true` when the error only means nothing has been loaded yet,
    /// which a host presents as its empty state rather than a failure.
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, Self::NotLoaded { .. } | Self::EmptyContainer)
    }
}

/// The location of the package document, as declared by `META-INF/container.xml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerPointer {
    rootfile_path: String,
}

impl ContainerPointer {
    /// The declared `full-path`, relative to the archive root.
    pub fn rootfile_path(&self) -> &str {
        &self.rootfile_path
    }

    /// The reader-relative path the package document is published at,
    /// given the `wrapper` directory its archive was published without.
    pub fn published_path(&self, wrapper: Option<&str>) -> &str {
        publish::strip_wrapper(self.rootfile_path.trim_start_matches('/'), wrapper)
    }
}

/// One content document in reading order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpineItem {
    href: String,
    path: String,
}

impl SpineItem {
    /// The href exactly as declared by the package document.
    ///
    /// Used as the stable identifier of the composed block.
    pub fn href(&self) -> &str {
        &self.href
    }

    /// The decoded, reader-relative path the document is published at.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// The reading order and language declared by a package document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageManifest {
    package_path: String,
    language: String,
    spine: Vec<SpineItem>,
    generation: Option<Generation>,
}

impl PackageManifest {
    /// The reader-relative path of the package document.
    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    /// The declared language; empty when the package declares none.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Content documents in reading order.
    pub fn spine(&self) -> &[SpineItem] {
        &self.spine
    }

    /// The generation the package document was published by, if known.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }
}

/// Fetches and parses the control documents of the currently published archive.
#[derive(Clone)]
pub struct ManifestResolver {
    fetcher: Arc<dyn ResourceFetcher>,
    store: Arc<ResourceStore>,
    base_url: String,
    timeout: Duration,
}

impl ManifestResolver {
    /// Creates a resolver reading through `fetcher`.
    ///
    /// `store` is the store the archive was published into; it tells which
    /// wrapper directory, if any, was stripped from the declared rootfile path.
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        store: Arc<ResourceStore>,
        settings: &ReaderSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            base_url: settings.url_prefix(),
            timeout: settings.fetch_timeout,
        }
    }

    /// Resolves the spine and language of the currently published archive.
    ///
    /// # Errors
    /// See [`ManifestError`]; [`ManifestError::is_not_loaded`] distinguishes
    /// the common "nothing loaded yet" state from genuine failures.
    pub async fn resolve(&self) -> Result<PackageManifest, ManifestError> {
        let container = match self.fetch_text(consts::CONTAINER).await {
            Ok((text, _)) => text,
            Err(source) if source.is_not_found() => {
                return Err(ManifestError::NotLoaded { source });
            }
            Err(source) => {
                return Err(ManifestError::Fetch {
                    source,
                    path: consts::CONTAINER.to_owned(),
                });
            }
        };
        if container.trim().is_empty() {
            return Err(ManifestError::EmptyContainer);
        }

        let pointer = container::parse_container(&container)?;
        let wrapper = self.store.wrapper();
        let package_path = pointer.published_path(wrapper.as_deref());
        debug!(
            rootfile = pointer.rootfile_path(),
            wrapper = wrapper.as_deref(),
            package_path,
            "resolved container pointer"
        );

        let (package, generation) =
            self.fetch_text(package_path)
                .await
                .map_err(|source| ManifestError::Fetch {
                    source,
                    path: package_path.to_owned(),
                })?;

        let mut manifest = package::parse_package(&package, package_path)?;
        manifest.generation = generation;
        Ok(manifest)
    }

    async fn fetch_text(&self, path: &str) -> fetch::FetchResult<(String, Option<Generation>)> {
        let url = publish::public_url(&self.base_url, path);
        let resource = fetch::fetch_with_timeout(self.fetcher.as_ref(), &url, self.timeout).await?;

        Ok((resource.text()?, resource.generation))
    }
}
