//! Whole-document loading, saving, and format detection.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use log::debug;

use crate::binary::{BinaryTagReader, BinaryTagWriter};
use crate::error::{Error, Result};
use crate::sniff::{self, Compression};
use crate::tag::Tag;
use crate::xml::{XmlTagReader, XmlTagWriter};
use crate::TagType;

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NbtFormat {
    /// The compact binary wire format; gzip-wrapped when saved through the
    /// facade.
    Binary,
    /// The equivalent XML representation, never compressed.
    Xml,
}

/// A complete document: a Compound root plus its chosen wire format.
///
/// The facade owns format detection, codec selection, and the compression
/// wrappers around the underlying streams; the codecs themselves never see
/// compressed bytes.
#[derive(Debug)]
pub struct NbtDocument {
    root: Tag,
    format: NbtFormat,
}

impl NbtDocument {
    /// An empty binary-format document with an unnamed Compound root.
    pub fn new() -> NbtDocument {
        NbtDocument {
            root: Tag::compound(""),
            format: NbtFormat::Binary,
        }
    }

    /// Wraps an existing root, which must be a Compound tag.
    pub fn with_root(root: Tag) -> Result<NbtDocument> {
        if root.tag_type() != TagType::Compound {
            return Err(Error::usage("a document root must be a compound tag"));
        }
        Ok(NbtDocument {
            root,
            format: NbtFormat::Binary,
        })
    }

    /// The root tag. The returned handle is the live root: mutating it
    /// mutates the document.
    pub fn root(&self) -> Tag {
        self.root.clone()
    }

    /// Replaces the root; the replacement must be a Compound tag.
    pub fn set_root(&mut self, root: Tag) -> Result<()> {
        if root.tag_type() != TagType::Compound {
            return Err(Error::usage("a document root must be a compound tag"));
        }
        self.root = root;
        Ok(())
    }

    pub fn format(&self) -> NbtFormat {
        self.format
    }

    pub fn set_format(&mut self, format: NbtFormat) {
        self.format = format;
    }

    // ---- format detection ----

    /// Determines the format of a byte source without consuming it: the
    /// read position is restored before returning. `None` means the source
    /// is not a recognizable document in either format.
    pub fn detect_format<R: Read + Seek>(source: &mut R) -> Result<Option<NbtFormat>> {
        let position = source.stream_position()?;

        if sniff::is_binary_document(source) {
            return Ok(Some(NbtFormat::Binary));
        }

        let is_xml = match XmlTagReader::new(source.by_ref()) {
            Ok(mut reader) => reader.is_nbt_document(),
            Err(_) => false,
        };
        source.seek(SeekFrom::Start(position))?;

        Ok(if is_xml { Some(NbtFormat::Xml) } else { None })
    }

    pub fn detect_file_format(path: impl AsRef<Path>) -> Result<Option<NbtFormat>> {
        let mut file = File::open(path)?;
        Self::detect_format(&mut file)
    }

    /// True when the source holds a document in either format. The read
    /// position is restored before returning.
    pub fn is_nbt_document<R: Read + Seek>(source: &mut R) -> Result<bool> {
        Ok(Self::detect_format(source)?.is_some())
    }

    // ---- loading ----

    /// Loads a document, auto-detecting XML versus binary and any gzip,
    /// zlib, or bare-deflate framing around binary data.
    pub fn load<R: Read + Seek>(source: &mut R) -> Result<NbtDocument> {
        let format = match Self::detect_format(source)? {
            Some(format) => format,
            None => {
                return Err(Error::malformed(
                    "unrecognized or unsupported document format",
                ))
            }
        };

        let root = match format {
            NbtFormat::Binary => {
                let compression = sniff::detect_compression(source)?;
                debug!("loading binary document, compression {:?}", compression);
                match compression {
                    Some(Compression::Gzip) => {
                        BinaryTagReader::new(GzDecoder::new(source.by_ref())).read_document()?
                    }
                    Some(Compression::Zlib) => {
                        BinaryTagReader::new(ZlibDecoder::new(source.by_ref())).read_document()?
                    }
                    Some(Compression::Deflate) => {
                        BinaryTagReader::new(DeflateDecoder::new(source.by_ref())).read_document()?
                    }
                    None => BinaryTagReader::new(source.by_ref()).read_document()?,
                }
            }
            NbtFormat::Xml => {
                debug!("loading xml document");
                XmlTagReader::new(source.by_ref())?.read_document()?
            }
        };

        Ok(NbtDocument { root, format })
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<NbtDocument> {
        let mut file = File::open(path)?;
        Self::load(&mut file)
    }

    /// Loads from a source that cannot seek by buffering it fully in memory
    /// first.
    pub fn load_buffered<R: Read>(mut source: R) -> Result<NbtDocument> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        Self::load(&mut Cursor::new(data))
    }

    // ---- saving ----

    /// Saves the document in its chosen format. Binary documents are always
    /// gzip-wrapped; XML documents are written as-is.
    pub fn save<W: Write>(&self, sink: W) -> Result<()> {
        match self.format {
            NbtFormat::Binary => {
                let mut encoder = GzEncoder::new(sink, flate2::Compression::default());
                self.write_binary(&mut encoder)?;
                encoder.finish()?;
                Ok(())
            }
            NbtFormat::Xml => {
                let mut writer = XmlTagWriter::new(sink);
                writer.write_start_document()?;
                writer.write_tag(&self.root)?;
                writer.write_end_document()?;
                writer.flush()
            }
        }
    }

    /// Saves binary documents without the gzip wrapper (XML documents are
    /// unaffected).
    pub fn save_uncompressed<W: Write>(&self, sink: W) -> Result<()> {
        match self.format {
            NbtFormat::Binary => self.write_binary(sink),
            NbtFormat::Xml => self.save(sink),
        }
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.save(file)
    }

    fn write_binary<W: Write>(&self, sink: W) -> Result<()> {
        let mut writer = BinaryTagWriter::new(sink);
        writer.write_start_document()?;
        writer.write_tag(&self.root)?;
        writer.write_end_document()?;
        writer.flush()
    }

    // ---- cheap identification ----

    /// Reads just the declared name of the root tag, in either format,
    /// without materializing the tree. `None` when the source is not a
    /// document. The read position is restored before returning.
    pub fn read_document_name<R: Read + Seek>(source: &mut R) -> Result<Option<String>> {
        let position = source.stream_position()?;

        let name = Self::binary_root_name(source);
        source.seek(SeekFrom::Start(position))?;
        if name.is_some() {
            return Ok(name);
        }

        let name = match XmlTagReader::new(source.by_ref()) {
            Ok(mut reader) => reader.read_root_name().ok(),
            Err(_) => None,
        };
        source.seek(SeekFrom::Start(position))?;
        Ok(name)
    }

    pub fn read_file_document_name(path: impl AsRef<Path>) -> Result<Option<String>> {
        let mut file = File::open(path)?;
        Self::read_document_name(&mut file)
    }

    fn binary_root_name<R: Read + Seek>(source: &mut R) -> Option<String> {
        if !sniff::is_binary_document(source) {
            return None;
        }
        match sniff::detect_compression(source).ok()? {
            Some(Compression::Gzip) => BinaryTagReader::new(GzDecoder::new(source.by_ref()))
                .read_root_name()
                .ok(),
            Some(Compression::Zlib) => BinaryTagReader::new(ZlibDecoder::new(source.by_ref()))
                .read_root_name()
                .ok(),
            Some(Compression::Deflate) => BinaryTagReader::new(DeflateDecoder::new(source.by_ref()))
                .read_root_name()
                .ok(),
            None => BinaryTagReader::new(source.by_ref()).read_root_name().ok(),
        }
    }

    // ---- queries ----

    /// Resolves a path query against the root. See [`Tag::query`].
    pub fn query(&self, path: &str) -> Option<Tag> {
        self.root.query(path)
    }

    /// See [`Tag::query_as`].
    pub fn query_as(&self, path: &str, kind: TagType) -> Option<Tag> {
        self.root.query_as(path, kind)
    }
}

impl Default for NbtDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NbtDocument {
    /// An indented dump of the tree, one tag per line. List members render
    /// with their position, named tags with their name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_tag(
            f: &mut fmt::Formatter<'_>,
            tag: &Tag,
            indent: usize,
            list_index: Option<usize>,
        ) -> fmt::Result {
            write!(f, "{:width$}", "", width = indent * 2)?;
            write!(f, "{}", tag.tag_type().name().to_ascii_lowercase())?;
            match list_index {
                Some(index) => write!(f, "#{}", index)?,
                None => write!(f, ":{}", tag.name())?,
            }
            if !tag.tag_type().is_container() {
                write!(f, " [{}]", tag.value_string())?;
            }
            writeln!(f)?;

            let in_list = tag.tag_type() == TagType::List;
            for (index, child) in tag.children().iter().enumerate() {
                write_tag(f, child, indent + 1, in_list.then_some(index))?;
            }
            Ok(())
        }

        write_tag(f, &self.root, 0, None)
    }
}
