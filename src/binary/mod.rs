//! The binary wire codec.
//!
//! All multi-byte numerics are big-endian on the wire regardless of host
//! byte order; every read and write goes through [`byteorder`]'s
//! `BigEndian`, so no endianness state exists anywhere. Compression framing
//! is not handled here; the document facade wraps the stream before the
//! codec sees it.

mod reader;
mod writer;

pub use reader::BinaryTagReader;
pub use writer::BinaryTagWriter;

/// Maximum UTF-8 byte length of a name or string payload on the wire.
pub(crate) const MAX_STRING_LEN: usize = i16::MAX as usize;
