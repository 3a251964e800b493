use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::error::{Error, Result};
use crate::state::TagState;
use crate::tag::{Tag, TagCollection, TagDictionary, TagValue};
use crate::TagType;

use super::MAX_STRING_LEN;

/// Writes a tag tree to the binary wire format.
///
/// One writer drives one output stream through one `TagState`; it is not
/// reentrant. The usual sequence is `write_start_document`, `write_tag` with
/// the root compound, `write_end_document`, then `flush`.
pub struct BinaryTagWriter<W: Write> {
    writer: W,
    state: TagState,
}

impl<W: Write> BinaryTagWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            state: TagState::new(),
        }
    }

    pub fn write_start_document(&mut self) -> Result<()> {
        self.state.start()
    }

    /// Validates that the state machine closed every frame it opened.
    pub fn write_end_document(&mut self) -> Result<()> {
        self.state.set_complete()
    }

    /// Writes one tag and its whole subtree. The tag's names and string
    /// values are validated against the wire length limit before any byte is
    /// emitted, so a failing tree writes nothing.
    pub fn write_tag(&mut self, tag: &Tag) -> Result<()> {
        validate_strings(tag)?;
        self.write_tag_inner(tag)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_tag_inner(&mut self, tag: &Tag) -> Result<()> {
        let name = tag.name();
        let kind = tag.tag_type();
        self.write_start_tag(&name, kind)?;
        self.write_payload(tag)?;
        self.write_end_tag()
    }

    /// Opens a frame. The type byte and name are only on the wire outside
    /// list contexts: a list's header already fixes its children's type, and
    /// its children are unnamed.
    fn write_start_tag(&mut self, name: &str, kind: TagType) -> Result<()> {
        let prev = self.state.start_tag(kind)?;
        let in_list = prev.map(|ctx| ctx.is_list()).unwrap_or(false);
        if kind != TagType::End && !in_list {
            self.writer.write_u8(kind.into())?;
            self.write_string(name)?;
        }
        Ok(())
    }

    /// Closes the current frame, emitting the End marker when the frame was
    /// a compound.
    fn write_end_tag(&mut self) -> Result<()> {
        let closed = self.state.end_tag()?;
        if matches!(closed, crate::state::Context::Tag(TagType::Compound)) {
            self.writer.write_u8(TagType::End.into())?;
        }
        Ok(())
    }

    fn write_payload(&mut self, tag: &Tag) -> Result<()> {
        let value = tag.value();
        match &*value {
            TagValue::End => Ok(()),
            TagValue::Byte(v) => {
                self.writer.write_u8(*v)?;
                Ok(())
            }
            TagValue::Short(v) => {
                self.writer.write_i16::<BigEndian>(*v)?;
                Ok(())
            }
            TagValue::Int(v) => {
                self.writer.write_i32::<BigEndian>(*v)?;
                Ok(())
            }
            TagValue::Long(v) => {
                self.writer.write_i64::<BigEndian>(*v)?;
                Ok(())
            }
            TagValue::Float(v) => {
                self.writer.write_f32::<BigEndian>(*v)?;
                Ok(())
            }
            TagValue::Double(v) => {
                self.writer.write_f64::<BigEndian>(*v)?;
                Ok(())
            }
            TagValue::ByteArray(v) => self.write_byte_array(v),
            TagValue::String(v) => self.write_string(v),
            TagValue::List(items) => self.write_list(items),
            TagValue::Compound(children) => self.write_compound(children),
            TagValue::IntArray(v) => self.write_int_array(v),
        }
    }

    fn write_list(&mut self, items: &TagCollection) -> Result<()> {
        // An untyped list can only be empty; Byte stands in for its
        // declared element type on the wire.
        let element = items.limit_type().unwrap_or(TagType::Byte);
        self.state.start_list(element, Some(items.len()))?;
        self.writer.write_u8(element.into())?;
        self.writer.write_i32::<BigEndian>(items.len() as i32)?;
        for item in items.tags() {
            self.write_tag_inner(&item)?;
        }
        Ok(())
    }

    fn write_compound(&mut self, children: &TagDictionary) -> Result<()> {
        for child in children.tags() {
            self.write_tag_inner(&child)?;
        }
        Ok(())
    }

    /// Length-prefixed UTF-8. An empty string is a zero length with no
    /// payload.
    fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(Error::string_too_long(bytes.len()));
        }
        self.writer.write_u16::<BigEndian>(bytes.len() as u16)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn write_byte_array(&mut self, values: &[u8]) -> Result<()> {
        self.writer.write_i32::<BigEndian>(values.len() as i32)?;
        self.writer.write_all(values)?;
        Ok(())
    }

    fn write_int_array(&mut self, values: &[i32]) -> Result<()> {
        self.writer.write_i32::<BigEndian>(values.len() as i32)?;
        for value in values {
            self.writer.write_i32::<BigEndian>(*value)?;
        }
        Ok(())
    }
}

fn validate_strings(tag: &Tag) -> Result<()> {
    if tag.name().len() > MAX_STRING_LEN {
        return Err(Error::string_too_long(tag.name().len()));
    }
    if let TagValue::String(s) = &*tag.value() {
        if s.len() > MAX_STRING_LEN {
            return Err(Error::string_too_long(s.len()));
        }
    }
    for child in tag.children() {
        validate_strings(&child)?;
    }
    Ok(())
}
