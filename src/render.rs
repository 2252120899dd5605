//! Composition of spine documents into one continuous reading surface.

mod images;
mod surface;

use crate::errors::{ReaderError, ReaderResult};
use crate::fetch::{self, FetchError, FetchedResource, ResourceFetcher};
use crate::manifest::{PackageManifest, SpineItem};
use crate::publish::{self, Generation};
use crate::session::ReaderSettings;
use crate::state::{ReadingState, ReadingStateStore};
use crate::util::uri;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use surface::{ContentBlock, ImageElement, ImageState, LinkTarget, ReadingSurface};

/// Summary of one completed composition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Number of composed blocks.
    pub blocks: usize,
    /// Number of image elements on the surface.
    pub images: usize,
    /// Number of image elements that failed to load.
    pub failed_images: usize,
    /// The scroll offset applied after images settled, if one was persisted.
    pub restored_scroll: Option<u32>,
    /// The generation the composed content belongs to.
    pub generation: Option<Generation>,
}

/// Fetches spine documents and composes them into a [`ReadingSurface`].
#[derive(Clone)]
pub struct CompositionRenderer {
    fetcher: Arc<dyn ResourceFetcher>,
    state: Arc<dyn ReadingStateStore>,
    base_url: String,
    timeout: Duration,
}

impl CompositionRenderer {
    /// Creates a renderer reading content through `fetcher`
    /// and the persisted scroll offset from `state`.
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        state: Arc<dyn ReadingStateStore>,
        settings: &ReaderSettings,
    ) -> Self {
        Self {
            fetcher,
            state,
            base_url: settings.url_prefix(),
            timeout: settings.fetch_timeout,
        }
    }

    /// Replaces the content of `surface` with the spine of `manifest`.
    ///
    /// The surface is cleared and takes the manifest's language first. Each
    /// spine document is then fetched in order and appended as its own block.
    /// Once every image on the surface has settled, the persisted scroll
    /// offset is applied.
    ///
    /// # Errors
    /// [`ReaderError::ContentFetch`] when a spine document cannot be fetched,
    /// is not text, or belongs to another generation. Remaining documents are
    /// not fetched and the partially composed surface is left in place.
    pub async fn render(
        &self,
        manifest: &PackageManifest,
        surface: &mut ReadingSurface,
    ) -> ReaderResult<RenderReport> {
        self.render_until(manifest, surface, std::future::pending())
            .await
    }

    /// Same as [`Self::render`], aborting with [`ReaderError::Superseded`]
    /// as soon as `superseded` completes.
    pub(crate) async fn render_until(
        &self,
        manifest: &PackageManifest,
        surface: &mut ReadingSurface,
        superseded: impl Future<Output = ()>,
    ) -> ReaderResult<RenderReport> {
        tokio::pin!(superseded);

        surface.clear();
        surface.set_language(manifest.language());
        surface.set_generation(manifest.generation());

        for item in manifest.spine() {
            let block = tokio::select! {
                biased;
                () = &mut superseded => return Err(ReaderError::Superseded),
                block = self.compose(item, manifest.generation()) => block?,
            };
            surface.append(block);
        }
        debug!(blocks = surface.blocks().len(), "composed spine");

        let settled = tokio::select! {
            biased;
            () = &mut superseded => return Err(ReaderError::Superseded),
            settled = images::settle(
                &self.fetcher,
                surface.images().map(ImageElement::url),
                self.timeout,
            ) => settled,
        };

        let mut report = RenderReport {
            blocks: surface.blocks().len(),
            generation: surface.generation(),
            ..RenderReport::default()
        };
        for image in surface.images_mut() {
            image.state = settled.get(&image.url).copied().unwrap_or(ImageState::Failed);
            report.images += 1;
            if image.state == ImageState::Failed {
                report.failed_images += 1;
            }
        }

        // Layout height is final only now that every image has settled.
        let ReadingState { scroll_top, .. } = ReadingState::load(self.state.as_ref());
        if scroll_top > 0 {
            surface.set_scroll_top(scroll_top);
            report.restored_scroll = Some(scroll_top);
        }

        info!(
            blocks = report.blocks,
            images = report.images,
            failed_images = report.failed_images,
            "rendered reading surface"
        );
        Ok(report)
    }

    async fn compose(
        &self,
        item: &SpineItem,
        generation: Option<Generation>,
    ) -> ReaderResult<ContentBlock> {
        let content_fetch = |source| ReaderError::ContentFetch {
            source,
            href: item.href().to_owned(),
        };

        let url = publish::public_url(&self.base_url, item.path());
        let resource = fetch::fetch_with_timeout(self.fetcher.as_ref(), &url, self.timeout)
            .await
            .and_then(|resource| check_generation(resource, generation))
            .map_err(content_fetch)?;
        let markup = resource.text().map_err(content_fetch)?;

        let scan = images::scan(&markup);
        let directory = uri::parent(item.path());
        let images = scan
            .images
            .into_iter()
            .map(|src| {
                let url = if uri::has_scheme(&src) {
                    src.clone()
                } else {
                    publish::public_url(&self.base_url, &uri::resolve(directory, &src))
                };
                ImageElement {
                    src,
                    url,
                    state: ImageState::Pending,
                }
            })
            .collect();

        Ok(ContentBlock {
            id: item.href().to_owned(),
            path: item.path().to_owned(),
            url: resource.url,
            markup,
            images,
            anchors: scan.anchors,
        })
    }
}

fn check_generation(
    resource: FetchedResource,
    expected: Option<Generation>,
) -> fetch::FetchResult<FetchedResource> {
    match (expected, resource.generation) {
        (Some(expected), Some(found)) if expected != found => Err(FetchError::StaleGeneration {
            url: resource.url,
            expected,
            found,
        }),
        _ => Ok(resource),
    }
}
