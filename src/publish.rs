//! Publishing of decoded archive entries under stable, fetchable URLs.
//!
//! Relative references between resources keep working after extraction because
//! each entry is served at the reader's base URL joined with its archive path,
//! minus the wrapper directory that packaging tools place everything in.

pub(crate) mod mime;
mod store;

use crate::archive::DecodedEntry;
use crate::session::ReaderSettings;
pub use mime::content_type_for;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
pub use store::{Bucket, ResourceStore};
use tracing::{debug, info, warn};

mod consts {
    pub(super) const MIMETYPE: &str = "mimetype";
    pub(super) const META_INF: &str = "META-INF/";
}

/// Identifies one complete load cycle of a packaged document.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Creates a generation from its sequence number.
    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// The sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for Generation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decoded archive entry served at a public URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedResource {
    pub(crate) source_path: String,
    pub(crate) public_url: String,
    pub(crate) content_type: &'static str,
    pub(crate) payload: Arc<[u8]>,
    pub(crate) generation: Generation,
}

impl PublishedResource {
    /// The original archive path.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// The URL the resource is served at.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// The served `Content-Type`.
    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// The served `Content-Length`.
    pub fn content_length(&self) -> usize {
        self.payload.len()
    }

    /// The raw bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The generation that published this resource.
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Possible errors while publishing a generation.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    /// Two archive paths map to the same public URL after stripping.
    ///
    /// Nothing is published; the previous generation keeps being served.
    #[error("[UrlCollision - `{url}`]: Both `{first}` and `{second}` would be served here")]
    UrlCollision {
        /// The contested URL.
        url: String,
        /// The archive path that claimed the URL first.
        first: String,
        /// The archive path that collided with it.
        second: String,
    },
}

/// Finds the wrapper directory of an archive, given all of its entry paths.
///
/// Packaging tools place every content entry inside one top-level directory
/// (such as `OEBPS/`), next to the fixed `mimetype` and `META-INF/` entries.
/// That directory is the wrapper when its name consists only of word characters
/// (`[A-Za-z0-9_]`) and every other entry lives inside it. Flat archives, with
/// content at the root or spread over several top-level directories, have none.
pub fn detect_wrapper<'a>(paths: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut wrapper = None;

    for path in paths {
        if path == consts::MIMETYPE || path.starts_with(consts::META_INF) {
            continue;
        }
        match path.split_once('/') {
            Some((first, _)) if wrapper.is_none_or(|wrapper| wrapper == first) => {
                wrapper = Some(first);
            }
            _ => return None,
        }
    }
    wrapper.filter(|first| {
        !first.is_empty()
            && first
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
    })
}

/// Strips the `wrapper` directory from an archive path,
/// as in `OEBPS/text/ch1.xhtml` -> `text/ch1.xhtml`.
///
/// Paths outside the wrapper, and every path of an archive without one,
/// are left untouched.
pub fn strip_wrapper<'a>(path: &'a str, wrapper: Option<&str>) -> &'a str {
    wrapper
        .and_then(|wrapper| path.strip_prefix(wrapper))
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

/// A stripped path is publishable when it is non-empty and addresses a location
/// strictly inside the reader root.
fn is_publishable(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && path
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

/// Publishes decoded entries into a [`ResourceStore`].
#[derive(Clone, Debug)]
pub struct ResourcePublisher {
    store: Arc<ResourceStore>,
    base_url: String,
    bucket: Bucket,
}

impl ResourcePublisher {
    /// Creates a publisher writing into `store` under the configured base URL and bucket.
    pub fn new(store: Arc<ResourceStore>, settings: &ReaderSettings) -> Self {
        Self {
            store,
            base_url: settings.url_prefix(),
            bucket: Bucket::Named(settings.cache_name.clone()),
        }
    }

    /// The URL a reader-relative path is served at.
    pub fn public_url(&self, path: &str) -> String {
        public_url(&self.base_url, path)
    }

    /// Publishes `entries` as `generation`, replacing everything published before.
    ///
    /// The wrapper directory is decided once for the whole archive (see
    /// [`detect_wrapper`]) and stripped from every entry inside it. Entries whose stripped path is empty or escapes the reader root are
    /// skipped and logged. The previous generation, including anything in the
    /// [`Bucket::Default`] bucket, is evicted in the same step that writes the
    /// new one. Once this returns, every resource is fetchable.
    ///
    /// # Errors
    /// [`PublishError::UrlCollision`] when two entries map to the same URL;
    /// the store is left untouched.
    pub fn publish(
        &self,
        generation: Generation,
        entries: Vec<DecodedEntry>,
    ) -> Result<Vec<PublishedResource>, PublishError> {
        let wrapper = detect_wrapper(entries.iter().map(|decoded| decoded.entry.path()))
            .map(str::to_owned);
        debug!(wrapper = wrapper.as_deref(), "decided wrapper directory");

        let mut claimed = HashMap::<String, usize>::with_capacity(entries.len());
        let mut resources = Vec::<PublishedResource>::with_capacity(entries.len());

        for DecodedEntry { entry, payload } in entries {
            let stripped = strip_wrapper(entry.path(), wrapper.as_deref());
            if !is_publishable(stripped) {
                warn!(path = entry.path(), "skipping entry without a publishable path");
                continue;
            }
            let resource = PublishedResource {
                public_url: self.public_url(stripped),
                content_type: content_type_for(stripped),
                source_path: entry.path,
                payload: payload.into(),
                generation,
            };

            match claimed.entry(resource.public_url.clone()) {
                Entry::Occupied(existing) => {
                    return Err(PublishError::UrlCollision {
                        first: resources[*existing.get()].source_path.clone(),
                        url: resource.public_url,
                        second: resource.source_path,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(resources.len());
                    resources.push(resource);
                }
            }
        }

        let evicted = self.store.replace_generation(
            self.bucket.clone(),
            generation,
            wrapper,
            resources.clone(),
        );

        debug!(%generation, evicted, "evicted previous generation");
        info!(%generation, resources = resources.len(), "published archive");
        Ok(resources)
    }
}

pub(crate) fn public_url(base_url: &str, path: &str) -> String {
    let mut url = String::with_capacity(base_url.len() + path.len());
    url.push_str(base_url);
    url.push_str(path);
    url
}
