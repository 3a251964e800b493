//! Detection of compression framing and document types.
//!
//! Every probe here has peek semantics: the source's read position is saved
//! up front and restored before returning, whatever the outcome, so repeated
//! calls are idempotent.

use std::io::{self, Read, Seek, SeekFrom};

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::TagType;

/// Compression framing found at the head of a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// A gzip member header (`1F 8B 08`).
    Gzip,
    /// A zlib wrapper (deflate with a 2-byte header and checksum, e.g.
    /// `78 9C`).
    Zlib,
    /// A bare deflate block with no wrapper.
    Deflate,
}

/// Classifies the compression framing at the source's current position, or
/// `None` for raw data. The read position is unchanged on return.
pub fn detect_compression<R: Read + Seek>(source: &mut R) -> io::Result<Option<Compression>> {
    let position = source.stream_position()?;
    let mut head = [0u8; 3];
    let available = read_up_to(source, &mut head)?;
    source.seek(SeekFrom::Start(position))?;
    Ok(classify(&head[..available]))
}

fn classify(head: &[u8]) -> Option<Compression> {
    if head.len() >= 3 && head[0] == 0x1F && head[1] == 0x8B && head[2] == 0x08 {
        return Some(Compression::Gzip);
    }
    // zlib: compression method 8 in the low nibble, and the two header
    // bytes, read big-endian, are a multiple of 31.
    if head.len() >= 2
        && head[0] & 0x0F == 8
        && u16::from_be_bytes([head[0], head[1]]) % 31 == 0
    {
        return Some(Compression::Zlib);
    }
    // bare deflate: a final block (bit 0) of fixed or dynamic Huffman type
    // (exactly one of bits 1 and 2).
    if let Some(&first) = head.first() {
        let final_block = first & 0b001 != 0;
        let fixed = first & 0b010 != 0;
        let dynamic = first & 0b100 != 0;
        if final_block && (fixed != dynamic) {
            return Some(Compression::Deflate);
        }
    }
    None
}

/// True when the source holds a binary document: after stripping any
/// compression framing, the first payload byte is the Compound type code.
/// Anything below expectations, including decompression failures and empty
/// sources, answers `false` rather than an error. The read position is
/// unchanged on return.
pub fn is_binary_document<R: Read + Seek>(source: &mut R) -> bool {
    let position = match source.stream_position() {
        Ok(p) => p,
        Err(_) => return false,
    };
    let result = matches!(
        first_payload_byte(source),
        Ok(Some(byte)) if byte == u8::from(TagType::Compound)
    );
    source.seek(SeekFrom::Start(position)).is_ok() && result
}

fn first_payload_byte<R: Read + Seek>(source: &mut R) -> io::Result<Option<u8>> {
    match detect_compression(source)? {
        Some(Compression::Gzip) => read_one(&mut GzDecoder::new(source.by_ref())),
        Some(Compression::Zlib) => read_one(&mut ZlibDecoder::new(source.by_ref())),
        Some(Compression::Deflate) => read_one(&mut DeflateDecoder::new(source.by_ref())),
        None => read_one(source),
    }
}

fn read_one<R: Read>(source: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match source.read_exact(&mut byte) {
        Ok(()) => Ok(Some(byte[0])),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_up_to<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
