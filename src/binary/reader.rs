use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::state::TagState;
use crate::tag::{Tag, TagCollection, TagDictionary, TagValue};
use crate::TagType;

/// Reads a tag tree from the binary wire format.
///
/// The reader expects already-decompressed bytes; the document facade strips
/// any gzip/zlib/deflate framing first. One reader drives one input stream
/// through one `TagState` and cannot be reused once its document is
/// complete.
pub struct BinaryTagReader<R: Read> {
    reader: R,
    state: TagState,
}

impl<R: Read> BinaryTagReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: TagState::new(),
        }
    }

    /// Reads a whole document and returns its root, which must be a
    /// Compound.
    pub fn read_document(&mut self) -> Result<Tag> {
        let tag = self.read_tag()?;
        if tag.tag_type() != TagType::Compound {
            return Err(Error::malformed("document root is not a compound tag"));
        }
        self.state.set_complete()?;
        Ok(tag)
    }

    /// Reads the next tag and its whole subtree.
    pub fn read_tag(&mut self) -> Result<Tag> {
        self.state.ensure_started()?;
        self.read_tag_inner()
    }

    /// Reads just the declared name of the root tag, without materializing
    /// anything below it. The stream is left pointing at the root's payload;
    /// the reader should not be used for anything else afterwards.
    pub fn read_root_name(&mut self) -> Result<String> {
        let kind = self.read_tag_type()?;
        if kind != TagType::Compound {
            return Err(Error::malformed("document root is not a compound tag"));
        }
        self.read_string()
    }

    fn read_tag_inner(&mut self) -> Result<Tag> {
        let kind = self.read_tag_type()?;
        let prev = self.state.start_tag(kind)?;
        let in_list = prev.map(|ctx| ctx.is_list()).unwrap_or(false);

        let name = if kind != TagType::End && !in_list {
            self.read_string()?
        } else {
            String::new()
        };

        let value = self.read_payload(kind)?;
        self.state.end_tag()?;

        Ok(Tag::with_name_value(name, value))
    }

    fn read_payload(&mut self, kind: TagType) -> Result<TagValue> {
        Ok(match kind {
            TagType::End => TagValue::End,
            TagType::Byte => TagValue::Byte(self.reader.read_u8()?),
            TagType::Short => TagValue::Short(self.reader.read_i16::<BigEndian>()?),
            TagType::Int => TagValue::Int(self.reader.read_i32::<BigEndian>()?),
            TagType::Long => TagValue::Long(self.reader.read_i64::<BigEndian>()?),
            TagType::Float => TagValue::Float(self.reader.read_f32::<BigEndian>()?),
            TagType::Double => TagValue::Double(self.reader.read_f64::<BigEndian>()?),
            TagType::ByteArray => TagValue::ByteArray(self.read_byte_array()?),
            TagType::String => TagValue::String(self.read_string()?),
            TagType::List => TagValue::List(self.read_list()?),
            TagType::Compound => TagValue::Compound(self.read_compound()?),
            TagType::IntArray => TagValue::IntArray(self.read_int_array()?),
        })
    }

    fn read_tag_type(&mut self) -> Result<TagType> {
        let byte = self.reader.read_u8()?;
        TagType::try_from(byte).map_err(|_| Error::invalid_tag(byte))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.reader.read_u16::<BigEndian>()? as usize;
        let mut buf = vec![0; len];
        self.reader.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::nonunicode(e.as_bytes()))
    }

    /// A list payload: 1 element-type byte, a 4-byte count, then that many
    /// bare payloads. The element type must itself be a payload-bearing
    /// type; anything else names the offending value in the error.
    fn read_list(&mut self) -> Result<TagCollection> {
        let type_byte = self.reader.read_u8()?;
        let element = match TagType::try_from(type_byte) {
            Ok(TagType::End) | Err(()) => return Err(Error::invalid_list_type(type_byte)),
            Ok(kind) => kind,
        };

        // A negative count reads as an empty list.
        let declared = self.reader.read_i32::<BigEndian>()?;
        let len = declared.max(0) as usize;
        self.state.start_list(element, Some(len))?;

        let mut items = TagCollection::with_limit(element);
        for _ in 0..len {
            self.state.start_tag(element)?;
            let value = self.read_payload(element)?;
            self.state.end_tag()?;
            items.push_orphan(Tag::with_name_value(String::new(), value));
        }
        Ok(items)
    }

    /// A compound payload: named tags until the End marker.
    fn read_compound(&mut self) -> Result<TagDictionary> {
        let mut children = TagDictionary::new();
        loop {
            let tag = self.read_tag_inner()?;
            if tag.tag_type() == TagType::End {
                break;
            }
            let name = tag.name();
            children
                .insert_orphan(tag)
                .map_err(|_| Error::malformed(format!("duplicate tag name {:?} in compound", name)))?;
        }
        Ok(children)
    }

    fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let len = self.read_array_len()?;
        let mut buf = vec![0; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_int_array(&mut self) -> Result<Vec<i32>> {
        let len = self.read_array_len()?;
        let mut values = vec![0i32; len];
        for value in &mut values {
            *value = self.reader.read_i32::<BigEndian>()?;
        }
        Ok(values)
    }

    fn read_array_len(&mut self) -> Result<usize> {
        let len = self.reader.read_i32::<BigEndian>()?;
        if len < 0 {
            return Err(Error::malformed(format!("negative array length {}", len)));
        }
        Ok(len as usize)
    }
}
