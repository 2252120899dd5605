use crate::publish::Generation;
use crate::util::uri;

/// Load state of an image element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageState {
    /// Not settled yet.
    Pending,
    /// The image finished loading.
    Loaded,
    /// The image definitively failed to load.
    Failed,
}

impl ImageState {
    /// Returns `true` once the image has either loaded or failed.
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// An image referenced by a composed block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageElement {
    pub(crate) src: String,
    pub(crate) url: String,
    pub(crate) state: ImageState,
}

impl ImageElement {
    /// The source exactly as written in the markup.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// The URL the image is requested from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The current load state.
    pub fn state(&self) -> ImageState {
        self.state
    }
}

/// One spine document appended to the reading surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentBlock {
    pub(crate) id: String,
    pub(crate) path: String,
    pub(crate) url: String,
    pub(crate) markup: String,
    pub(crate) images: Vec<ImageElement>,
    pub(crate) anchors: Vec<String>,
}

impl ContentBlock {
    /// The stable identifier: the spine href as declared.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The reader-relative path of the source document.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The URL the document was fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The document markup, as fetched.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Images in document order.
    pub fn images(&self) -> &[ImageElement] {
        &self.images
    }

    /// Returns `true` if an element within the block carries `id`.
    pub fn has_anchor(&self, id: &str) -> bool {
        self.anchors.iter().any(|anchor| anchor == id)
    }
}

/// Where an in-document link points to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkTarget<'a> {
    /// The block containing the target.
    pub block: &'a ContentBlock,
    /// The element id within the block, if the link names one.
    pub fragment: Option<&'a str>,
}

/// The shared, scrollable reading surface every spine document is composed into.
///
/// A page is one scroll-height of content; layout is left to the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadingSurface {
    language: Option<String>,
    blocks: Vec<ContentBlock>,
    scroll_top: u32,
    generation: Option<Generation>,
}

impl ReadingSurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// The document language attribute.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Composed blocks in spine order.
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    /// Retrieves a block by its identifier.
    pub fn block(&self, id: &str) -> Option<&ContentBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// Every image element in document order.
    pub fn images(&self) -> impl Iterator<Item = &ImageElement> + '_ {
        self.blocks.iter().flat_map(|block| block.images.iter())
    }

    /// The current scroll offset, in pixels.
    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    /// Scrolls the surface.
    pub fn set_scroll_top(&mut self, scroll_top: u32) {
        self.scroll_top = scroll_top;
    }

    /// The generation whose content is composed.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    /// Returns `true` if nothing is composed.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Resolves an in-document link, such as `text/ch2.xhtml#note-3` or `#note-3`.
    ///
    /// A link with a path targets the block published at that path (or declared
    /// with that href); a bare fragment targets the first block containing an
    /// element with that id.
    pub fn resolve_link<'a>(&'a self, link: &'a str) -> Option<LinkTarget<'a>> {
        let (main, fragment) = uri::split_fragment(link);
        let fragment = fragment.filter(|fragment| !fragment.is_empty());

        let block = if main.is_empty() {
            let fragment = fragment?;
            self.blocks.iter().find(|block| block.has_anchor(fragment))?
        } else {
            let path = uri::resolve("", main);
            self.blocks
                .iter()
                .find(|block| block.id == main || block.path == path)?
        };
        Some(LinkTarget { block, fragment })
    }

    pub(crate) fn clear(&mut self) {
        self.language = None;
        self.blocks.clear();
        self.scroll_top = 0;
        self.generation = None;
    }

    pub(crate) fn set_language(&mut self, language: &str) {
        self.language = (!language.is_empty()).then(|| language.to_owned());
    }

    pub(crate) fn set_generation(&mut self, generation: Option<Generation>) {
        self.generation = generation;
    }

    pub(crate) fn append(&mut self, block: ContentBlock) {
        self.blocks.push(block);
    }

    pub(crate) fn images_mut(&mut self) -> impl Iterator<Item = &mut ImageElement> + '_ {
        self.blocks.iter_mut().flat_map(|block| block.images.iter_mut())
    }
}
