//! Fixture books built in memory, and fetchers wrapping a store.

use scroll_reader::fetch::{FetchResult, FetchedResource, ResourceFetcher};
use scroll_reader::publish::ResourceStore;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub(super) const BASE_URL: &str = "https://reader.example/app/";

pub(super) const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub(super) fn url(path: &str) -> String {
    format!("{BASE_URL}{path}")
}

pub(super) fn zip(files: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in files {
        let options = SimpleFileOptions::default().compression_method(*method);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A package document listing `chapters` as XHTML items, in order.
pub(super) fn package(language: &str, chapters: &[&str]) -> String {
    let items = chapters
        .iter()
        .enumerate()
        .map(|(i, href)| {
            format!(r#"<item id="c{i}" href="{href}" media-type="application/xhtml+xml"/>"#)
        })
        .collect::<String>();
    let itemrefs = (0..chapters.len())
        .map(|i| format!(r#"<itemref idref="c{i}"/>"#))
        .collect::<String>();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>
    <dc:title>Fixture</dc:title>
    <dc:language>{language}</dc:language>
  </metadata>
  <manifest>
    <item id="css" href="styles/main.css" media-type="text/css"/>
    {items}
  </manifest>
  <spine>{itemrefs}</spine>
</package>"#
    )
}

pub(super) fn chapter(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <head><link rel="stylesheet" href="../styles/main.css"/></head>
  <body>{body}</body>
</html>"#
    )
}

/// Builds a book wrapped in `OEBPS/`, with every chapter and extra file placed inside it.
pub(super) struct BookBuilder {
    language: String,
    chapters: Vec<(String, String)>,
    files: Vec<(String, Vec<u8>)>,
}

impl BookBuilder {
    pub(super) fn new(language: &str) -> Self {
        Self {
            language: language.to_owned(),
            chapters: Vec::new(),
            files: Vec::new(),
        }
    }

    pub(super) fn chapter(mut self, href: &str, body: &str) -> Self {
        self.chapters.push((href.to_owned(), chapter(body)));
        self
    }

    /// Declares `href` in the spine without shipping it.
    pub(super) fn missing_chapter(mut self, href: &str) -> Self {
        self.chapters.push((href.to_owned(), String::new()));
        self
    }

    pub(super) fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.files.push((path.to_owned(), data.to_vec()));
        self
    }

    pub(super) fn build(self) -> Vec<u8> {
        let hrefs = self
            .chapters
            .iter()
            .map(|(href, _)| href.as_str())
            .collect::<Vec<_>>();
        let package = package(&self.language, &hrefs);

        let mut files = vec![
            ("mimetype".to_owned(), b"application/epub+zip".to_vec(), CompressionMethod::Stored),
            ("META-INF/container.xml".to_owned(), CONTAINER.as_bytes().to_vec(), CompressionMethod::Deflated),
            ("OEBPS/content.opf".to_owned(), package.into_bytes(), CompressionMethod::Deflated),
            ("OEBPS/styles/main.css".to_owned(), b"body { margin: 0 }".to_vec(), CompressionMethod::Deflated),
        ];
        files.extend(
            self.chapters
                .into_iter()
                .filter(|(_, markup)| !markup.is_empty())
                .map(|(href, markup)| (format!("OEBPS/{href}"), markup.into_bytes(), CompressionMethod::Deflated)),
        );
        files.extend(
            self.files
                .into_iter()
                .map(|(path, data)| (path, data, CompressionMethod::Stored)),
        );

        let files = files
            .iter()
            .map(|(path, data, method)| (path.as_str(), data.as_slice(), *method))
            .collect::<Vec<_>>();
        zip(&files)
    }
}

/// Reads through a store, recording every requested URL.
///
/// Requests for URLs ending with the hang suffix never complete;
/// the first such request notifies [`RecordingFetcher::reached_hang`].
pub(super) struct RecordingFetcher {
    store: Arc<ResourceStore>,
    requests: Mutex<Vec<String>>,
    hang_suffix: Option<String>,
    hung: Notify,
}

impl RecordingFetcher {
    pub(super) fn new(store: Arc<ResourceStore>) -> Self {
        Self {
            store,
            requests: Mutex::new(Vec::new()),
            hang_suffix: None,
            hung: Notify::new(),
        }
    }

    pub(super) fn hanging_on(mut self, suffix: &str) -> Self {
        self.hang_suffix = Some(suffix.to_owned());
        self
    }

    pub(super) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(super) async fn reached_hang(&self) {
        self.hung.notified().await;
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource> {
        self.requests.lock().unwrap().push(url.to_owned());

        if self
            .hang_suffix
            .as_deref()
            .is_some_and(|suffix| url.ends_with(suffix))
        {
            self.hung.notify_one();
            std::future::pending::<()>().await;
        }
        self.store.fetch(url).await
    }
}
