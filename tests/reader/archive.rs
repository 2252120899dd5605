use crate::reader::util;
use scroll_reader::archive::{self, ArchiveDecoder, ArchiveError, EntryCompression};
use zip::CompressionMethod;

/// Method 97 (WavPack) is registered for zip but not supported by the decoder.
const UNSUPPORTED_METHOD: u16 = 97;

fn set_method(bytes: &mut [u8], header: usize, offset: usize) {
    bytes[header + offset..header + offset + 2].copy_from_slice(&UNSUPPORTED_METHOD.to_le_bytes());
}

#[test]
fn test_round_trip() {
    let text = "It was a bright cold day in April. ".repeat(64);
    let files: [(&str, &[u8], CompressionMethod); 3] = [
        ("OEBPS/a.txt", b"stored content", CompressionMethod::Stored),
        ("OEBPS/b.xhtml", text.as_bytes(), CompressionMethod::Deflated),
        ("OEBPS/images/c.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3], CompressionMethod::Deflated),
    ];
    let bytes = util::zip(&files);

    let entries = archive::list_entries(&bytes).unwrap();
    assert_eq!(3, entries.len());

    for (entry, (path, data, _)) in entries.iter().zip(files) {
        assert_eq!(path, entry.path());
        assert_eq!(data.len() as u64, entry.uncompressed_size());
        assert_eq!(data, archive::read_entry(&bytes, entry).unwrap());
    }
}

#[test]
fn test_corrupt_archive() {
    assert!(matches!(
        archive::list_entries(b"definitely not a zip archive"),
        Err(ArchiveError::CorruptArchive { .. })
    ));

    let bytes = util::BookBuilder::new("en").chapter("ch1.xhtml", "<p>One</p>").build();
    // Without its trailing central directory, the archive cannot be listed.
    let truncated = &bytes[..bytes.len() / 2];
    assert!(matches!(
        ArchiveDecoder::new(truncated),
        Err(ArchiveError::CorruptArchive { .. })
    ));
}

#[test]
fn test_unsupported_method_fails_individually() {
    let mut bytes = util::zip(&[
        ("OEBPS/exotic.bin", b"opaque payload", CompressionMethod::Stored),
        ("OEBPS/plain.txt", b"plain payload", CompressionMethod::Stored),
    ]);
    // The first local header starts the archive; its method lives at offset 8.
    set_method(&mut bytes, 0, 8);
    // The first central directory header; its method lives at offset 10.
    let central = bytes
        .windows(4)
        .position(|window| window == b"PK\x01\x02")
        .unwrap();
    set_method(&mut bytes, central, 10);

    let entries = archive::list_entries(&bytes).unwrap();
    assert_eq!(2, entries.len());
    assert!(!entries[0].compression().is_supported());
    assert_eq!(&EntryCompression::Stored, entries[1].compression());

    assert!(matches!(
        archive::read_entry(&bytes, &entries[0]),
        Err(ArchiveError::Decompression { path, .. }) if path == "OEBPS/exotic.bin"
    ));
    assert_eq!(b"plain payload".to_vec(), archive::read_entry(&bytes, &entries[1]).unwrap());

    let (decoded, failed) = ArchiveDecoder::new(&bytes).unwrap().decode_all();
    assert_eq!(1, decoded.len());
    assert_eq!("OEBPS/plain.txt", decoded[0].entry.path());
    assert_eq!(1, failed.len());
}

#[test]
fn test_degenerate_paths_are_listed() {
    let bytes = util::zip(&[
        ("LICENSE", b"free", CompressionMethod::Stored),
        ("OEBPS/.hidden", b"", CompressionMethod::Stored),
    ]);
    let paths = archive::list_entries(&bytes)
        .unwrap()
        .into_iter()
        .map(|entry| entry.path().to_owned())
        .collect::<Vec<_>>();

    assert_eq!(vec!["LICENSE", "OEBPS/.hidden"], paths);
}
