use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use flate2::read::GzEncoder;
use flate2::write::{DeflateEncoder, ZlibEncoder};

use crate::sniff::{detect_compression, is_binary_document, Compression};
use crate::test::builder::Builder;
use crate::TagType;

fn empty_document() -> Vec<u8> {
    Builder::new().start_compound("root").end_compound().build()
}

fn gzipped(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzEncoder::new(data, flate2::Compression::default())
        .read_to_end(&mut out)
        .unwrap();
    out
}

fn zlibbed(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn deflated(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn gzip_header_is_detected() {
    let mut source = Cursor::new(vec![0x1F, 0x8B, 0x08, 0x00]);
    assert_eq!(
        detect_compression(&mut source).unwrap(),
        Some(Compression::Gzip)
    );
}

#[test]
fn zlib_header_is_detected_as_deflate_framing() {
    let mut source = Cursor::new(vec![0x78, 0x9C]);
    assert_eq!(
        detect_compression(&mut source).unwrap(),
        Some(Compression::Zlib)
    );
}

#[test]
fn bare_deflate_blocks_are_detected() {
    // BFINAL set, fixed Huffman: 0b011.
    let mut source = Cursor::new(vec![0x03, 0x00]);
    assert_eq!(
        detect_compression(&mut source).unwrap(),
        Some(Compression::Deflate)
    );
}

#[test]
fn raw_binary_is_not_mistaken_for_compression() {
    // A raw document starts with the Compound code, 0x0A.
    let mut source = Cursor::new(empty_document());
    assert_eq!(detect_compression(&mut source).unwrap(), None);
}

#[test]
fn detection_never_moves_the_read_position() {
    let mut source = Cursor::new(gzipped(&empty_document()));
    source.seek(SeekFrom::Start(0)).unwrap();
    detect_compression(&mut source).unwrap();
    assert_eq!(source.stream_position().unwrap(), 0);

    // And not from a mid-stream position either.
    let mut padded = Vec::from(&b"junk"[..]);
    padded.extend_from_slice(&gzipped(&empty_document()));
    let mut source = Cursor::new(padded);
    source.seek(SeekFrom::Start(4)).unwrap();
    detect_compression(&mut source).unwrap();
    assert_eq!(source.stream_position().unwrap(), 4);
}

#[test]
fn repeated_detection_is_idempotent() {
    let mut source = Cursor::new(gzipped(&empty_document()));
    let first = detect_compression(&mut source).unwrap();
    let second = detect_compression(&mut source).unwrap();
    assert_eq!(first, Some(Compression::Gzip));
    assert_eq!(first, second);
}

#[test]
fn compound_first_byte_confirms_a_document() {
    let document = empty_document();

    for data in [
        document.clone(),
        gzipped(&document),
        zlibbed(&document),
        deflated(&document),
    ] {
        let mut source = Cursor::new(data);
        assert!(is_binary_document(&mut source));
        assert_eq!(source.stream_position().unwrap(), 0);
    }
}

#[test]
fn non_compound_roots_are_not_documents() {
    let byte_root = Builder::new().byte("b", 1).build();
    assert!(!is_binary_document(&mut Cursor::new(byte_root.clone())));
    assert!(!is_binary_document(&mut Cursor::new(gzipped(&byte_root))));
}

#[test]
fn garbage_and_empty_sources_answer_false_not_error() {
    assert!(!is_binary_document(&mut Cursor::new(Vec::new())));
    assert!(!is_binary_document(&mut Cursor::new(vec![0xFF, 0xFE])));
    // A gzip header with a truncated body decompresses to nothing.
    assert!(!is_binary_document(&mut Cursor::new(vec![0x1F, 0x8B, 0x08])));
}

#[test]
fn short_sources_classify_as_raw() {
    let mut source = Cursor::new(vec![u8::from(TagType::Compound)]);
    assert_eq!(detect_compression(&mut source).unwrap(), None);
    assert_eq!(source.stream_position().unwrap(), 0);
}
