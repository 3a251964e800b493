//! nbtree materializes whole NBT documents as a mutable tag tree.
//!
//! NBT data is a self-describing hierarchy of named and unnamed nodes used to
//! persist structured game-world data. This crate models one document as a
//! tree of [`Tag`] handles, reads and writes the compact binary wire format
//! (optionally gzip- or zlib-compressed) and an equivalent XML
//! representation, and locates nodes in a loaded tree with a small path-query
//! language.
//!
//! * For the tree itself see [`Tag`] and [`TagValue`].
//! * For whole-document loading, saving and format detection see
//!   [`NbtDocument`].
//! * For the codecs see [`binary`] and [`xml`].
//! * For compression sniffing see [`sniff`].
//!
//! # Quick example
//!
//! Build a small document, write it out, and read it back:
//!
//! ```
//! use std::io::Cursor;
//! use nbtree::{NbtDocument, Tag};
//!
//! # fn main() -> nbtree::error::Result<()> {
//! let root = Tag::compound("hello world");
//! root.insert("name", "Bananrama")?;
//!
//! let doc = NbtDocument::with_root(root)?;
//! let mut buf = Cursor::new(Vec::new());
//! doc.save(&mut buf)?;
//!
//! buf.set_position(0);
//! let loaded = NbtDocument::load(&mut buf)?;
//! let name = loaded.query("name").and_then(|t| t.as_string());
//! assert_eq!(name.as_deref(), Some("Bananrama"));
//! # Ok(())
//! # }
//! ```
//!
//! # Path queries
//!
//! A query is a `\`- or `/`-delimited path. Plain segments look up compound
//! members, integer segments index into lists, and `[field=value]` segments
//! scan a list of compounds for the first element whose `field` child holds
//! the string `value`. A query that cannot be resolved returns `None`, it
//! never fails.

use std::fmt;

pub mod binary;
pub mod document;
pub mod error;
pub mod sniff;
pub mod xml;

mod query;
mod state;
mod tag;

pub use document::{NbtDocument, NbtFormat};
pub use tag::{Tag, TagCollection, TagDictionary, TagValue};

#[cfg(test)]
mod test;

/// The type of an NBT tag. This carries no value or name, only the kind of
/// node and its wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagType {
    /// Marks the end of a Compound on the wire. Has no name and no value.
    End = 0,
    /// An unsigned 8-bit integer.
    Byte = 1,
    /// Equivalent to i16.
    Short = 2,
    /// Equivalent to i32.
    Int = 3,
    /// Equivalent to i64.
    Long = 4,
    /// Equivalent to f32.
    Float = 5,
    /// Equivalent to f64.
    Double = 6,
    /// A flat array of bytes.
    ByteArray = 7,
    /// A UTF-8 string.
    String = 8,
    /// A sequence of unnamed tags sharing one declared element type.
    List = 9,
    /// An ordered collection of uniquely named tags.
    Compound = 10,
    /// A flat array of Int (i32).
    IntArray = 11,
}

// A derive crate could generate these conversions for us, but the tag
// codes will essentially never change, so they are written out manually.
impl TryFrom<u8> for TagType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        use TagType::*;
        Ok(match value {
            0 => End,
            1 => Byte,
            2 => Short,
            3 => Int,
            4 => Long,
            5 => Float,
            6 => Double,
            7 => ByteArray,
            8 => String,
            9 => List,
            10 => Compound,
            11 => IntArray,
            12..=u8::MAX => return Err(()),
        })
    }
}

impl From<TagType> for u8 {
    fn from(kind: TagType) -> Self {
        kind as u8
    }
}

impl TagType {
    /// Every tag type in wire-code order.
    pub const ALL: [TagType; 12] = [
        TagType::End,
        TagType::Byte,
        TagType::Short,
        TagType::Int,
        TagType::Long,
        TagType::Float,
        TagType::Double,
        TagType::ByteArray,
        TagType::String,
        TagType::List,
        TagType::Compound,
        TagType::IntArray,
    ];

    /// The canonical token for this type, as used by the XML codec.
    pub fn name(self) -> &'static str {
        match self {
            TagType::End => "End",
            TagType::Byte => "Byte",
            TagType::Short => "Short",
            TagType::Int => "Int",
            TagType::Long => "Long",
            TagType::Float => "Float",
            TagType::Double => "Double",
            TagType::ByteArray => "ByteArray",
            TagType::String => "String",
            TagType::List => "List",
            TagType::Compound => "Compound",
            TagType::IntArray => "IntArray",
        }
    }

    /// Parses a type token, ignoring ASCII case. Returns `None` for anything
    /// that is not a tag type name.
    pub fn from_name(token: &str) -> Option<TagType> {
        TagType::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(token))
    }

    /// True for the two container kinds, List and Compound.
    pub fn is_container(self) -> bool {
        matches!(self, TagType::List | TagType::Compound)
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
