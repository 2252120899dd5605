use crate::fetch::{self, ResourceFetcher};
use crate::parser::xml::{self, XmlElement, XmlReader};
use crate::render::surface::ImageState;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::warn;

mod consts {
    // Elements
    pub(super) const IMG: &str = "img";
    pub(super) const IMAGE: &str = "image";

    // Attributes
    pub(super) const SRC: &str = "src";
    pub(super) const HREF: &str = "href";
    pub(super) const XLINK_HREF: &str = "xlink:href";
    pub(super) const ID: &str = "id";
}

const DATA_SCHEME: &str = "data:";

/// References collected from one content document.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Scan {
    /// Image sources in document order, as written.
    pub(crate) images: Vec<String>,
    /// Element ids, usable as link targets.
    pub(crate) anchors: Vec<String>,
}

/// Collects image sources and element ids from loosely authored markup.
///
/// A syntax error skips the offending markup and scanning resumes after it.
/// Scanning stops only when the reader can no longer make progress; whatever
/// was found before that point is kept.
pub(crate) fn scan(markup: &str) -> Scan {
    let mut reader = xml::lenient_reader(markup.as_bytes());
    let mut scan = Scan::default();
    let mut failed_at = None;

    while let Some(result) = reader.next() {
        match result {
            Ok(Event::Start(el) | Event::Empty(el)) => collect(&el, &mut scan),
            Ok(_) => {}
            Err(error) => {
                let position = reader.buffer_position();
                if failed_at.is_some_and(|failed_at| failed_at >= position) {
                    warn!(%error, position, "stopped scanning malformed markup");
                    break;
                }
                warn!(%error, position, "skipping malformed markup");
                failed_at = Some(position);
            }
        }
    }
    scan
}

fn collect(el: &BytesStart, scan: &mut Scan) {
    if let Some(id) = el.get_attribute(consts::ID) {
        scan.anchors.push(id);
    }

    let source = if el.is_local_name(consts::IMG) {
        el.get_attribute(consts::SRC)
    } else if el.is_local_name(consts::IMAGE) {
        el.get_attribute(consts::HREF)
            .or_else(|| el.get_attribute(consts::XLINK_HREF))
    } else {
        None
    };
    if let Some(source) = source.filter(|source| !source.trim().is_empty()) {
        scan.images.push(source);
    }
}

/// Images embedded as `data:` URLs are complete without any request.
pub(crate) fn is_inline(url: &str) -> bool {
    url.get(..DATA_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(DATA_SCHEME))
}

/// Requests every distinct URL concurrently and waits until each one has settled.
///
/// A URL that fails, times out or whose task panics settles as
/// [`ImageState::Failed`]; none of them stall the join.
pub(crate) async fn settle<'a>(
    fetcher: &Arc<dyn ResourceFetcher>,
    urls: impl IntoIterator<Item = &'a str>,
    timeout: Duration,
) -> HashMap<String, ImageState> {
    let mut settled = HashMap::new();
    let mut tasks = JoinSet::new();

    for url in urls {
        if settled.contains_key(url) {
            continue;
        }
        if is_inline(url) {
            settled.insert(url.to_owned(), ImageState::Loaded);
            continue;
        }
        settled.insert(url.to_owned(), ImageState::Failed);

        let fetcher = Arc::clone(fetcher);
        let url = url.to_owned();
        tasks.spawn(async move {
            let state = match fetch::fetch_with_timeout(fetcher.as_ref(), &url, timeout).await {
                Ok(_) => ImageState::Loaded,
                Err(error) => {
                    warn!(%error, "image failed to load");
                    ImageState::Failed
                }
            };
            (url, state)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((url, state)) => {
                settled.insert(url, state);
            }
            Err(error) => warn!(%error, "image settle task did not complete"),
        }
    }
    settled
}
