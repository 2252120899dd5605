//! The host environment's resource-retrieval path.
//!
//! Every pipeline stage reads published content through a [`ResourceFetcher`],
//! never through the store directly, the same way a browser page reads its
//! resources through `fetch` while a cache answers underneath.

use crate::publish::Generation;
use crate::util::utf::{self, UtfError};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Alias for `Result<T, FetchError>`.
pub type FetchResult<T> = Result<T, FetchError>;

/// Possible errors while retrieving a resource.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Nothing is served at the requested URL.
    #[error("[NotFound - `{url}`]: No resource is served at this URL")]
    NotFound {
        /// The requested URL.
        url: String,
    },

    /// The retrieval did not complete within its bound.
    #[error("[TimedOut - `{url}`]: No response after {after:?}")]
    TimedOut {
        /// The requested URL.
        url: String,
        /// The bound that elapsed.
        after: Duration,
    },

    /// The resource was published by a different archive generation than expected.
    #[error("[StaleGeneration - `{url}`]: Expected generation {expected}, found {found}")]
    StaleGeneration {
        /// The requested URL.
        url: String,
        /// The generation the caller is composing.
        expected: Generation,
        /// The generation that published the resource.
        found: Generation,
    },

    /// The resource was retrieved although its body is not readable text.
    #[error("[InvalidText - `{url}`]: {source}")]
    InvalidText {
        /// The root cause of the error.
        source: UtfError,
        /// The requested URL.
        url: String,
    },

    /// A host-specific failure, such as a network error.
    #[error("[Host - `{url}`]: {source}")]
    Host {
        /// The root cause of the error.
        source: Box<dyn Error + Send + Sync + 'static>,
        /// The requested URL.
        url: String,
    },
}

impl FetchError {
    /// Returns `true` if nothing is served at the requested URL.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A retrieved resource along with its response headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    /// The URL the resource was retrieved from.
    pub url: String,
    /// The `Content-Type` header.
    pub content_type: String,
    /// The `Content-Length` header.
    pub content_length: usize,
    /// The response body.
    pub body: Arc<[u8]>,
    /// The archive generation that published the resource,
    /// if served from published content.
    pub generation: Option<Generation>,
}

impl FetchedResource {
    /// Reads the body as text.
    ///
    /// # Errors
    /// [`FetchError::InvalidText`] when the body is neither UTF-8 nor BOM-marked UTF-16.
    pub fn text(&self) -> FetchResult<String> {
        utf::decode_text(&self.body).map_err(|source| FetchError::InvalidText {
            source,
            url: self.url.clone(),
        })
    }
}

/// Retrieves resources by URL.
///
/// [`ResourceStore`](crate::publish::ResourceStore) is the default implementation;
/// hosts wrap or replace it to add network access or instrumentation.
#[async_trait::async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Retrieves the resource served at `url`.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource>;
}

#[async_trait::async_trait]
impl<F: ResourceFetcher + ?Sized> ResourceFetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource> {
        (**self).fetch(url).await
    }
}

/// Retrieves `url`, failing with [`FetchError::TimedOut`] once `timeout` elapses.
pub async fn fetch_with_timeout(
    fetcher: &dyn ResourceFetcher,
    url: &str,
    timeout: Duration,
) -> FetchResult<FetchedResource> {
    tokio::time::timeout(timeout, fetcher.fetch(url))
        .await
        .unwrap_or_else(|_| {
            Err(FetchError::TimedOut {
                url: url.to_owned(),
                after: timeout,
            })
        })
}
