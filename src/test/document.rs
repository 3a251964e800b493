use std::io::{Cursor, Seek, SeekFrom, Write};

use flate2::write::{DeflateEncoder, ZlibEncoder};

use crate::error::ErrorKind;
use crate::{NbtDocument, NbtFormat, Tag, TagCollection};

fn sample_root() -> Tag {
    let root = Tag::compound("hello world");
    root.insert("name", "Bananrama").unwrap();
    root.insert("count", 42i32).unwrap();
    let items = root.insert("items", TagCollection::new()).unwrap();
    items.push_all([1i32, 2, 3]).unwrap();
    root
}

fn saved(doc: &NbtDocument) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    doc.save(&mut buf).unwrap();
    buf.into_inner()
}

#[test]
fn binary_saves_are_always_gzip_wrapped() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let data = saved(&doc);
    assert_eq!(&data[..3], &[0x1F, 0x8B, 0x08]);
}

#[test]
fn binary_save_load_round_trip() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let mut source = Cursor::new(saved(&doc));

    let loaded = NbtDocument::load(&mut source).unwrap();
    assert_eq!(loaded.format(), NbtFormat::Binary);
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn uncompressed_binary_loads_too() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let mut buf = Cursor::new(Vec::new());
    doc.save_uncompressed(&mut buf).unwrap();

    buf.set_position(0);
    let loaded = NbtDocument::load(&mut buf).unwrap();
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn zlib_and_deflate_framed_documents_load() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let mut raw = Cursor::new(Vec::new());
    doc.save_uncompressed(&mut raw).unwrap();
    let raw = raw.into_inner();

    let mut zlib = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    zlib.write_all(&raw).unwrap();
    let loaded = NbtDocument::load(&mut Cursor::new(zlib.finish().unwrap())).unwrap();
    assert_eq!(loaded.root(), doc.root());

    let mut deflate = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    deflate.write_all(&raw).unwrap();
    let loaded = NbtDocument::load(&mut Cursor::new(deflate.finish().unwrap())).unwrap();
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn xml_save_load_round_trip() {
    let mut doc = NbtDocument::with_root(sample_root()).unwrap();
    doc.set_format(NbtFormat::Xml);

    let data = saved(&doc);
    assert!(data.starts_with(b"<?xml"));

    let mut source = Cursor::new(data);
    let loaded = NbtDocument::load(&mut source).unwrap();
    assert_eq!(loaded.format(), NbtFormat::Xml);
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn format_detection_does_not_consume_the_source() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let mut source = Cursor::new(saved(&doc));

    assert_eq!(
        NbtDocument::detect_format(&mut source).unwrap(),
        Some(NbtFormat::Binary)
    );
    assert_eq!(source.stream_position().unwrap(), 0);

    // Detection twice, then a load, all from the same source.
    assert_eq!(
        NbtDocument::detect_format(&mut source).unwrap(),
        Some(NbtFormat::Binary)
    );
    assert!(NbtDocument::load(&mut source).is_ok());
}

#[test]
fn xml_documents_are_detected() {
    let mut doc = NbtDocument::with_root(sample_root()).unwrap();
    doc.set_format(NbtFormat::Xml);
    let mut source = Cursor::new(saved(&doc));

    assert_eq!(
        NbtDocument::detect_format(&mut source).unwrap(),
        Some(NbtFormat::Xml)
    );
    assert_eq!(source.stream_position().unwrap(), 0);
}

#[test]
fn unrecognized_sources_detect_as_none_and_fail_to_load() {
    let mut source = Cursor::new(b"neither format".to_vec());
    assert_eq!(NbtDocument::detect_format(&mut source).unwrap(), None);
    assert!(!NbtDocument::is_nbt_document(&mut source).unwrap());

    let err = NbtDocument::load(&mut source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn the_document_root_must_be_a_compound() {
    assert!(NbtDocument::with_root(Tag::int("x", 1)).unwrap_err().is_usage());

    let mut doc = NbtDocument::new();
    assert!(doc.set_root(Tag::list("l")).unwrap_err().is_usage());
    doc.set_root(Tag::compound("ok")).unwrap();
}

#[test]
fn the_default_document_is_an_empty_binary_compound() {
    let doc = NbtDocument::new();
    assert_eq!(doc.format(), NbtFormat::Binary);
    assert!(doc.root().is_empty());

    let mut source = Cursor::new(saved(&doc));
    let loaded = NbtDocument::load(&mut source).unwrap();
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn document_names_read_without_materializing() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let mut source = Cursor::new(saved(&doc));

    let name = NbtDocument::read_document_name(&mut source).unwrap();
    assert_eq!(name.as_deref(), Some("hello world"));
    assert_eq!(source.stream_position().unwrap(), 0);

    let mut doc = doc;
    doc.set_format(NbtFormat::Xml);
    let mut source = Cursor::new(saved(&doc));
    let name = NbtDocument::read_document_name(&mut source).unwrap();
    assert_eq!(name.as_deref(), Some("hello world"));

    let mut source = Cursor::new(b"garbage".to_vec());
    assert_eq!(NbtDocument::read_document_name(&mut source).unwrap(), None);
}

#[test]
fn file_round_trip_with_detection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("level.dat");

    let doc = NbtDocument::with_root(sample_root()).unwrap();
    doc.save_file(&path).unwrap();

    assert_eq!(
        NbtDocument::detect_file_format(&path).unwrap(),
        Some(NbtFormat::Binary)
    );
    assert_eq!(
        NbtDocument::read_file_document_name(&path).unwrap().as_deref(),
        Some("hello world")
    );

    let loaded = NbtDocument::load_file(&path).unwrap();
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn a_missing_file_is_an_io_error() {
    let err = NbtDocument::load_file("/no/such/file.dat").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn load_buffered_consumes_and_rewraps_unseekable_sources() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let data = saved(&doc);

    // A bare slice reader has no Seek implementation to lean on.
    let loaded = NbtDocument::load_buffered(data.as_slice()).unwrap();
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn seek_position_is_restored_even_from_mid_stream() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let mut padded = b"skip".to_vec();
    padded.extend_from_slice(&saved(&doc));

    let mut source = Cursor::new(padded);
    source.seek(SeekFrom::Start(4)).unwrap();
    assert_eq!(
        NbtDocument::detect_format(&mut source).unwrap(),
        Some(NbtFormat::Binary)
    );
    assert_eq!(source.stream_position().unwrap(), 4);

    let loaded = NbtDocument::load(&mut source).unwrap();
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn display_dumps_an_indented_tree() {
    let doc = NbtDocument::with_root(sample_root()).unwrap();
    let dump = doc.to_string();

    assert!(dump.starts_with("compound:hello world\n"));
    assert!(dump.contains("  string:name [Bananrama]"));
    assert!(dump.contains("  list:items\n"));
    assert!(dump.contains("    int#0 [1]"));
}
