use crate::reader::util;
use scroll_reader::ReaderSettings;
use scroll_reader::archive::ArchiveDecoder;
use scroll_reader::errors::PublishError;
use scroll_reader::fetch::ResourceFetcher;
use scroll_reader::publish::{self, Generation, ResourcePublisher, ResourceStore};
use std::sync::Arc;
use wasm_bindgen_test::wasm_bindgen_test;
use zip::CompressionMethod::{Deflated, Stored};

fn publisher() -> (Arc<ResourceStore>, ResourcePublisher) {
    let store = Arc::new(ResourceStore::new());
    let settings = ReaderSettings::builder().base_url(util::BASE_URL).build();
    (Arc::clone(&store), ResourcePublisher::new(Arc::clone(&store), &settings))
}

fn publish(publisher: &ResourcePublisher, generation: u64, bytes: &[u8]) {
    let (entries, _) = ArchiveDecoder::new(bytes).unwrap().decode_all();
    publisher.publish(Generation::new(generation), entries).unwrap();
}

#[test]
#[wasm_bindgen_test]
fn test_content_type_mapping() {
    #[rustfmt::skip]
    let expected = [
        ("image/png", "foo.png"),
        ("text/plain", "foo"),
        ("text/plain", "foo.unknownext"),
        ("application/xhtml+xml", "text/ch1.html"),
        ("image/jpeg", "images/COVER.JPG"),
        ("font/woff2", "fonts/serif.woff2"),
        ("text/plain", "styles/"),
    ];

    for (expect, path) in expected {
        assert_eq!(expect, publish::content_type_for(path), "{path}");
    }
}

#[test]
#[wasm_bindgen_test]
fn test_generation_isolation() {
    let (store, publisher) = publisher();

    let first = util::zip(&[
        ("OEBPS/ch1.xhtml", b"<p>first</p>", Deflated),
        ("OEBPS/only-in-first.css", b"p {}", Stored),
    ]);
    publish(&publisher, 1, &first);
    assert!(store.contains(&util::url("only-in-first.css")));

    let second = util::zip(&[("OEBPS/ch1.xhtml", b"<p>second</p>", Deflated)]);
    publish(&publisher, 2, &second);

    assert_eq!(vec![util::url("ch1.xhtml")], store.urls());
    let resource = store.get(&util::url("ch1.xhtml")).unwrap();
    assert_eq!(b"<p>second</p>", resource.payload());
    assert_eq!(Generation::new(2), resource.generation());
}

#[test]
#[wasm_bindgen_test]
fn test_collision_is_fatal_before_eviction() {
    let (store, publisher) = publisher();
    publish(&publisher, 1, &util::zip(&[("OEBPS/ch1.xhtml", b"<p/>", Stored)]));

    // Stripping `OEBPS/` moves the nested container onto the real one.
    let colliding = util::zip(&[
        ("META-INF/container.xml", util::CONTAINER.as_bytes(), Stored),
        ("OEBPS/META-INF/container.xml", util::CONTAINER.as_bytes(), Stored),
        ("OEBPS/content.opf", b"<package/>", Stored),
    ]);
    let (entries, _) = ArchiveDecoder::new(&colliding).unwrap().decode_all();
    let error = publisher.publish(Generation::new(2), entries).unwrap_err();

    assert!(matches!(
        error,
        PublishError::UrlCollision { url, .. } if url == util::url("META-INF/container.xml")
    ));
    assert_eq!(vec![util::url("ch1.xhtml")], store.urls());
    assert_eq!(Some(Generation::new(1)), store.generation());
}

#[test]
#[wasm_bindgen_test]
fn test_flat_archive_is_published_unstripped() {
    let (store, publisher) = publisher();
    let flat = util::zip(&[
        ("mimetype", b"application/epub+zip", Stored),
        ("content.opf", b"<package/>", Deflated),
        ("text/cover.xhtml", b"<p/>", Deflated),
        ("images/cover.xhtml", b"<p/>", Deflated),
    ]);
    publish(&publisher, 1, &flat);

    assert_eq!(
        vec![
            util::url("content.opf"),
            util::url("images/cover.xhtml"),
            util::url("mimetype"),
            util::url("text/cover.xhtml"),
        ],
        store.urls()
    );
    assert_eq!(None, store.wrapper());
}

#[tokio::test]
async fn test_published_resources_are_fetchable() {
    let (store, publisher) = publisher();
    let book = util::BookBuilder::new("en")
        .chapter("text/ch1.xhtml", "<p>One</p>")
        .file("OEBPS/images/cover.png", &[0x89, b'P', b'N', b'G'])
        .build();
    publish(&publisher, 1, &book);

    let cover = store.fetch(&util::url("images/cover.png")).await.unwrap();
    assert_eq!("image/png", cover.content_type);
    assert_eq!(4, cover.content_length);
    assert_eq!(Some(Generation::new(1)), cover.generation);

    // The container keeps its fixed location; the mimetype file stays at the root.
    let container = store.fetch(&util::url("META-INF/container.xml")).await.unwrap();
    assert_eq!("application/xml", container.content_type);
    assert!(store.contains(&util::url("mimetype")));

    let chapter = store.fetch(&util::url("text/ch1.xhtml?v=1#top")).await.unwrap();
    assert_eq!("application/xhtml+xml", chapter.content_type);
    assert!(chapter.text().unwrap().contains("<p>One</p>"));

    assert!(store.fetch(&util::url("OEBPS/content.opf")).await.unwrap_err().is_not_found());
}
