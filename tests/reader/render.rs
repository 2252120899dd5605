use crate::reader::util::{self, BookBuilder, RecordingFetcher};
use scroll_reader::archive::ArchiveDecoder;
use scroll_reader::errors::{FetchError, ReaderError};
use scroll_reader::manifest::ManifestResolver;
use scroll_reader::publish::{Generation, ResourcePublisher, ResourceStore};
use scroll_reader::render::{CompositionRenderer, ImageState, ReadingSurface};
use scroll_reader::state::{MemoryStateStore, ReadingStateStore};
use scroll_reader::ReaderSettings;
use std::sync::Arc;
use std::time::Duration;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

struct Pipeline {
    fetcher: Arc<RecordingFetcher>,
    state: Arc<MemoryStateStore>,
    resolver: ManifestResolver,
    renderer: CompositionRenderer,
}

impl Pipeline {
    /// Publishes `bytes` as generation 1 and wires every stage to the same store.
    fn new(bytes: &[u8], fetcher: impl FnOnce(Arc<ResourceStore>) -> RecordingFetcher) -> Self {
        let settings = ReaderSettings::builder()
            .base_url(util::BASE_URL)
            .fetch_timeout(Duration::from_millis(100))
            .build();
        let store = Arc::new(ResourceStore::new());
        let (entries, _) = ArchiveDecoder::new(bytes).unwrap().decode_all();
        ResourcePublisher::new(Arc::clone(&store), &settings)
            .publish(Generation::new(1), entries)
            .unwrap();

        let fetcher = Arc::new(fetcher(store.clone()));
        let state = Arc::new(MemoryStateStore::new());
        Self {
            resolver: ManifestResolver::new(fetcher.clone(), store, &settings),
            renderer: CompositionRenderer::new(fetcher.clone(), state.clone(), &settings),
            fetcher,
            state,
        }
    }

    async fn render(&self, surface: &mut ReadingSurface) -> Result<(), ReaderError> {
        let manifest = self.resolver.resolve().await?;
        self.renderer.render(&manifest, surface).await.map(|_| ())
    }
}

#[tokio::test]
async fn test_spine_order_is_preserved() {
    let book = BookBuilder::new("en")
        .chapter("intro.xhtml", "<p>Intro</p>")
        .chapter("ch1.xhtml", "<p>One</p>")
        .chapter("ch2.xhtml", "<p>Two</p>")
        .build();
    let pipeline = Pipeline::new(&book, RecordingFetcher::new);
    let mut surface = ReadingSurface::new();
    pipeline.render(&mut surface).await.unwrap();

    let ids = surface.blocks().iter().map(|block| block.id()).collect::<Vec<_>>();
    assert_eq!(vec!["intro.xhtml", "ch1.xhtml", "ch2.xhtml"], ids);
    assert!(surface.blocks()[1].markup().contains("<p>One</p>"));
    assert_eq!(Some("en"), surface.language());
    assert_eq!(Some(Generation::new(1)), surface.generation());
}

#[tokio::test]
async fn test_failed_image_still_settles() {
    let body = r#"<img src="images/a.png"/><img src="images/missing.png"/><img src="images/b.png"/>"#;
    let book = BookBuilder::new("en")
        .chapter("ch1.xhtml", body)
        .file("OEBPS/images/a.png", PNG)
        .file("OEBPS/images/b.png", PNG)
        .build();
    let pipeline = Pipeline::new(&book, RecordingFetcher::new);
    pipeline.state.set("scrollTop", "640".to_owned());

    let mut surface = ReadingSurface::new();
    let manifest = pipeline.resolver.resolve().await.unwrap();
    let report = pipeline.renderer.render(&manifest, &mut surface).await.unwrap();

    assert_eq!(3, report.images);
    assert_eq!(1, report.failed_images);
    assert_eq!(Some(640), report.restored_scroll);
    assert_eq!(640, surface.scroll_top());

    let states = surface.images().map(|image| image.state()).collect::<Vec<_>>();
    assert_eq!(
        vec![ImageState::Loaded, ImageState::Failed, ImageState::Loaded],
        states
    );
}

#[tokio::test]
async fn test_hung_image_times_out() {
    let body = r#"<p><img src="../images/slow.png"/><img src="data:image/gif;base64,R0lGOD"/></p>"#;
    let book = BookBuilder::new("en")
        .chapter("text/ch1.xhtml", body)
        .file("OEBPS/images/slow.png", PNG)
        .build();
    let pipeline = Pipeline::new(&book, |store| RecordingFetcher::new(store).hanging_on("slow.png"));

    let mut surface = ReadingSurface::new();
    pipeline.render(&mut surface).await.unwrap();

    let images = surface.images().collect::<Vec<_>>();
    assert_eq!(util::url("images/slow.png"), images[0].url());
    assert_eq!(ImageState::Failed, images[0].state());
    // Inline images never issue a request.
    assert_eq!(ImageState::Loaded, images[1].state());
    assert!(pipeline.fetcher.requests().iter().all(|url| !url.starts_with("data:")));
}

#[tokio::test]
async fn test_missing_spine_document_leaves_partial_surface() {
    let book = BookBuilder::new("fr")
        .chapter("ch1.xhtml", "<p>Un</p>")
        .missing_chapter("ch2.xhtml")
        .chapter("ch3.xhtml", "<p>Trois</p>")
        .build();
    let pipeline = Pipeline::new(&book, RecordingFetcher::new);
    let mut surface = ReadingSurface::new();
    let error = pipeline.render(&mut surface).await.unwrap_err();

    assert!(matches!(
        error,
        ReaderError::ContentFetch { href, source: FetchError::NotFound { .. } } if href == "ch2.xhtml"
    ));
    assert_eq!(1, surface.blocks().len());
    assert_eq!(Some("fr"), surface.language());
    // Remaining documents are never requested.
    assert!(!pipeline.fetcher.requests().contains(&util::url("ch3.xhtml")));
}

#[tokio::test]
async fn test_scroll_is_not_restored_without_offset() {
    let book = BookBuilder::new("en").chapter("ch1.xhtml", "<p>One</p>").build();
    let pipeline = Pipeline::new(&book, RecordingFetcher::new);

    let mut surface = ReadingSurface::new();
    surface.set_scroll_top(99);
    let manifest = pipeline.resolver.resolve().await.unwrap();
    let report = pipeline.renderer.render(&manifest, &mut surface).await.unwrap();

    assert_eq!(None, report.restored_scroll);
    assert_eq!(0, surface.scroll_top());
}

#[tokio::test]
async fn test_links_resolve_to_blocks() {
    let book = BookBuilder::new("en")
        .chapter("text/ch1.xhtml", r#"<p>See <a href="ch2.xhtml#note-1">note</a></p>"#)
        .chapter("text/ch2.xhtml", r#"<aside id="note-1">A note</aside>"#)
        .build();
    let pipeline = Pipeline::new(&book, RecordingFetcher::new);
    let mut surface = ReadingSurface::new();
    pipeline.render(&mut surface).await.unwrap();

    let target = surface.resolve_link("text/ch2.xhtml#note-1").unwrap();
    assert_eq!("text/ch2.xhtml", target.block.id());
    assert_eq!(Some("note-1"), target.fragment);

    let target = surface.resolve_link("#note-1").unwrap();
    assert_eq!(util::url("text/ch2.xhtml"), target.block.url());
}
