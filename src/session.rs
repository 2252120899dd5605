//! The reader session and the controller serializing load requests into it.

use crate::archive::ArchiveDecoder;
use crate::errors::{ReaderError, ReaderResult};
use crate::fetch::ResourceFetcher;
use crate::manifest::{ManifestError, ManifestResolver, PackageManifest};
use crate::publish::{Generation, ResourcePublisher, ResourceStore};
use crate::render::{CompositionRenderer, ReadingSurface, RenderReport};
use crate::state::{self, MemoryStateStore, ReadingState, ReadingStateStore, keys};
use crate::util::StringExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, warn};

/// Settings shared by every stage of a [`ReaderSession`].
///
/// To create a mutable settings instance, see
/// [`ReaderSettings::builder`] or [`ReaderSettings::default`].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Prefix of every public URL, such as `https://reader.example/app/`.
    ///
    /// A missing trailing `/` is implied.
    ///
    /// Default: `/`
    pub base_url: String,
    /// The bucket of the [`ResourceStore`] the publisher owns.
    ///
    /// Default: `book-cache`
    pub cache_name: String,
    /// Upper bound for every fetch, including each image settle.
    ///
    /// Default: 30 seconds
    pub fetch_timeout: Duration,
}

impl ReaderSettings {
    /// Returns a builder to create a [`ReaderSettings`] instance.
    pub fn builder() -> ReaderSettingsBuilder {
        ReaderSettingsBuilder(Self::default())
    }

    /// The base URL, guaranteed to end with `/`.
    pub(crate) fn url_prefix(&self) -> String {
        let mut prefix = self.base_url.clone();
        prefix.ensure_trailing_slash();
        prefix
    }
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            base_url: "/".to_owned(),
            cache_name: "book-cache".to_owned(),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl From<ReaderSettingsBuilder> for ReaderSettings {
    fn from(value: ReaderSettingsBuilder) -> Self {
        value.build()
    }
}

/// Builder to construct a [`ReaderSettings`] instance.
#[derive(Clone, Debug)]
pub struct ReaderSettingsBuilder(ReaderSettings);

impl ReaderSettingsBuilder {
    /// Turn this builder into a [`ReaderSettings`] instance.
    pub fn build(self) -> ReaderSettings {
        self.0
    }

    /// See [`ReaderSettings::base_url`].
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.0.base_url = base_url.into();
        self.0.base_url.ensure_trailing_slash();
        self
    }

    /// See [`ReaderSettings::cache_name`].
    pub fn cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.0.cache_name = cache_name.into();
        self
    }

    /// See [`ReaderSettings::fetch_timeout`].
    pub fn fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.0.fetch_timeout = fetch_timeout;
        self
    }
}

/// The result of a load attempt that did not fail.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The spine was composed into the reading surface.
    Rendered(RenderReport),
    /// No manifest could be resolved; the host shows its empty state.
    ///
    /// [`ManifestError::is_not_loaded`] tells the usual "nothing loaded yet"
    /// apart from a published archive with broken control documents.
    NothingLoaded(ManifestError),
}

impl LoadOutcome {
    /// The render report, if the spine was composed.
    pub fn report(&self) -> Option<&RenderReport> {
        match self {
            Self::Rendered(report) => Some(report),
            Self::NothingLoaded(_) => None,
        }
    }

    /// Treats a missing manifest as an error.
    ///
    /// # Errors
    /// [`ReaderError::ManifestUnavailable`] for [`LoadOutcome::NothingLoaded`].
    pub fn into_report(self) -> ReaderResult<RenderReport> {
        match self {
            Self::Rendered(report) => Ok(report),
            Self::NothingLoaded(error) => Err(ReaderError::ManifestUnavailable(error)),
        }
    }
}

/// Everything one reader owns: the published-resource store, the reading
/// surface, the current manifest and the persisted reading state.
///
/// Loads are strictly sequential through `&mut self`;
/// [`Reader`] serializes concurrent requests in front of a session.
pub struct ReaderSession {
    settings: ReaderSettings,
    store: Arc<ResourceStore>,
    state: Arc<dyn ReadingStateStore>,
    publisher: ResourcePublisher,
    resolver: ManifestResolver,
    renderer: CompositionRenderer,
    surface: ReadingSurface,
    manifest: Option<PackageManifest>,
}

impl ReaderSession {
    /// Creates a session reading straight from its own store,
    /// with reading state kept in memory.
    pub fn new(settings: impl Into<ReaderSettings>) -> Self {
        let store = Arc::new(ResourceStore::new());
        Self::with_host(
            settings,
            Arc::clone(&store),
            store,
            Arc::new(MemoryStateStore::new()),
        )
    }

    /// Creates a session publishing into `store` and reading through `fetcher`,
    /// which usually wraps the same store.
    pub fn with_host(
        settings: impl Into<ReaderSettings>,
        store: Arc<ResourceStore>,
        fetcher: Arc<dyn ResourceFetcher>,
        state: Arc<dyn ReadingStateStore>,
    ) -> Self {
        let settings = settings.into();

        Self {
            publisher: ResourcePublisher::new(Arc::clone(&store), &settings),
            resolver: ManifestResolver::new(Arc::clone(&fetcher), Arc::clone(&store), &settings),
            renderer: CompositionRenderer::new(fetcher, Arc::clone(&state), &settings),
            surface: ReadingSurface::new(),
            manifest: None,
            settings,
            store,
            state,
        }
    }

    /// The settings this session was created with.
    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    /// The store serving published resources.
    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    /// The reading surface.
    pub fn surface(&self) -> &ReadingSurface {
        &self.surface
    }

    /// The manifest of the last successful resolution.
    pub fn manifest(&self) -> Option<&PackageManifest> {
        self.manifest.as_ref()
    }

    /// The currently published generation.
    pub fn generation(&self) -> Option<Generation> {
        self.store.generation()
    }

    /// The persisted reading state.
    pub fn reading_state(&self) -> ReadingState {
        ReadingState::load(self.state.as_ref())
    }

    /// Decodes, publishes and renders a packaged document.
    ///
    /// Entries that fail to decode are skipped. A new archive starts
    /// reading from the top, so the persisted scroll offset is reset.
    ///
    /// # Errors
    /// - [`ReaderError::Archive`] when the central directory is unreadable.
    /// - [`ReaderError::Publish`] when entries collide on a public URL.
    ///
    /// In both cases the previous generation keeps being served.
    /// Afterward, see [`Self::refresh`].
    pub async fn load_archive(&mut self, bytes: &[u8]) -> ReaderResult<LoadOutcome> {
        self.load_archive_until(bytes, std::future::pending()).await
    }

    /// Resolves and renders whatever is currently published.
    ///
    /// This is what a reader does on startup: with nothing published yet,
    /// it yields [`LoadOutcome::NothingLoaded`].
    ///
    /// # Errors
    /// [`ReaderError::ContentFetch`] when a spine document cannot be fetched.
    pub async fn refresh(&mut self) -> ReaderResult<LoadOutcome> {
        self.refresh_until(std::future::pending()).await
    }

    /// Scrolls the surface and persists the offset.
    pub fn record_scroll(&mut self, scroll_top: u32) {
        self.surface.set_scroll_top(scroll_top);
        state::save_scroll_top(self.state.as_ref(), scroll_top);
    }

    /// Persists the font size, in pixels.
    pub fn set_font_size(&self, pixels: u32) {
        self.state.set(keys::FONT_SIZE, state::format_px(pixels));
    }

    /// Persists the page padding, in pixels.
    pub fn set_padding(&self, pixels: u32) {
        self.state.set(keys::PADDING, state::format_px(pixels));
    }

    async fn load_archive_until(
        &mut self,
        bytes: &[u8],
        superseded: impl Future<Output = ()>,
    ) -> ReaderResult<LoadOutcome> {
        let mut decoder = ArchiveDecoder::new(bytes)?;
        let (entries, skipped) = decoder.decode_all();
        if !skipped.is_empty() {
            warn!(skipped = skipped.len(), "publishing archive without its undecodable entries");
        }

        let generation = self.store.next_generation();
        self.publisher.publish(generation, entries)?;
        state::save_scroll_top(self.state.as_ref(), 0);

        self.refresh_until(superseded).await
    }

    async fn refresh_until(
        &mut self,
        superseded: impl Future<Output = ()>,
    ) -> ReaderResult<LoadOutcome> {
        tokio::pin!(superseded);

        let resolved = tokio::select! {
            biased;
            () = &mut superseded => return Err(ReaderError::Superseded),
            resolved = self.resolver.resolve() => resolved,
        };
        let manifest = match resolved {
            Ok(manifest) => manifest,
            Err(error) => {
                if error.is_not_loaded() {
                    debug!(%error, "nothing loaded");
                } else {
                    warn!(%error, "manifest unavailable");
                }
                self.manifest = None;
                self.surface.clear();
                return Ok(LoadOutcome::NothingLoaded(error));
            }
        };

        let manifest = self.manifest.insert(manifest);
        self.renderer
            .render_until(manifest, &mut self.surface, superseded)
            .await
            .map(LoadOutcome::Rendered)
    }
}

/// A single load request, valid until a newer one is issued.
struct LoadTicket {
    id: u64,
    requests: watch::Receiver<u64>,
}

impl LoadTicket {
    fn is_current(&self) -> bool {
        *self.requests.borrow() == self.id
    }

    /// Completes once a newer request has been issued.
    async fn superseded(mut self) {
        let id = self.id;
        let closed = self.requests.wait_for(|latest| *latest != id).await.is_err();
        if closed {
            // No newer request can ever be issued.
            std::future::pending::<()>().await;
        }
    }
}

/// Controller owning a [`ReaderSession`].
///
/// Load requests are strictly serialized. Issuing a request immediately
/// supersedes any in-flight one: the in-flight load stops at its next
/// suspension point (such as the image-settle join) with
/// [`ReaderError::Superseded`], and requests still queued behind it are dropped
/// the same way. Only the latest request runs to completion.
pub struct Reader {
    session: Mutex<ReaderSession>,
    requests: watch::Sender<u64>,
}

impl Reader {
    /// Creates a controller for `session`.
    pub fn new(session: ReaderSession) -> Self {
        let (requests, _) = watch::channel(0);
        Self {
            session: Mutex::new(session),
            requests,
        }
    }

    /// See [`ReaderSession::load_archive`].
    ///
    /// # Errors
    /// Additionally [`ReaderError::Superseded`] when a newer request was issued.
    pub async fn load_archive(&self, bytes: &[u8]) -> ReaderResult<LoadOutcome> {
        let ticket = self.issue();
        let mut session = self.acquire(&ticket).await?;
        session.load_archive_until(bytes, ticket.superseded()).await
    }

    /// See [`ReaderSession::refresh`].
    ///
    /// # Errors
    /// Additionally [`ReaderError::Superseded`] when a newer request was issued.
    pub async fn refresh(&self) -> ReaderResult<LoadOutcome> {
        let ticket = self.issue();
        let mut session = self.acquire(&ticket).await?;
        session.refresh_until(ticket.superseded()).await
    }

    /// Waits until no load is running and locks the session.
    pub async fn session(&self) -> MutexGuard<'_, ReaderSession> {
        self.session.lock().await
    }

    /// Unwraps the session.
    pub fn into_session(self) -> ReaderSession {
        self.session.into_inner()
    }

    fn issue(&self) -> LoadTicket {
        let mut id = 0;
        self.requests.send_modify(|latest| {
            *latest += 1;
            id = *latest;
        });
        LoadTicket {
            id,
            requests: self.requests.subscribe(),
        }
    }

    async fn acquire(&self, ticket: &LoadTicket) -> ReaderResult<MutexGuard<'_, ReaderSession>> {
        let session = self.session.lock().await;
        if ticket.is_current() {
            Ok(session)
        } else {
            debug!(request = ticket.id, "dropping superseded load request");
            Err(ReaderError::Superseded)
        }
    }
}
