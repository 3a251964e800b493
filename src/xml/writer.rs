use std::io::Write;

use crate::error::Result;
use crate::state::TagState;
use crate::tag::{Tag, TagValue};
use crate::TagType;

/// Writes a tag tree as XML, honoring the same structural contract as the
/// binary writer: the shared `TagState` decides which tags carry explicit
/// names and what type list children must be.
///
/// Each tag renders as one element. A tag whose name is a plain XML name
/// becomes an element of that name; any other name (including the empty
/// name) is preserved exactly in a `name` attribute on a generic `<tag>`
/// element. Tag types travel in a `type` attribute, except for list
/// children, whose type is implied by the `limitType` attribute declared
/// once on the list's own element.
pub struct XmlTagWriter<W: Write> {
    writer: W,
    state: TagState,
}

impl<W: Write> XmlTagWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            state: TagState::new(),
        }
    }

    pub fn write_start_document(&mut self) -> Result<()> {
        self.state.start()?;
        self.writer
            .write_all(b"<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
        Ok(())
    }

    pub fn write_end_document(&mut self) -> Result<()> {
        self.state.set_complete()
    }

    /// Writes one tag and its whole subtree as an element.
    pub fn write_tag(&mut self, tag: &Tag) -> Result<()> {
        let name = tag.name();
        let kind = tag.tag_type();
        let prev = self.state.start_tag(kind)?;
        let in_list = prev.map(|ctx| ctx.is_list()).unwrap_or(false);

        let mut attributes: Vec<(&str, String)> = Vec::new();
        let element = if in_list {
            kind.name().to_ascii_lowercase()
        } else {
            let element = if is_xml_name(&name) {
                name.clone()
            } else {
                attributes.push(("name", name.clone()));
                "tag".to_owned()
            };
            attributes.push(("type", kind.name().to_owned()));
            element
        };

        let list_element = match &*tag.value() {
            TagValue::List(items) => Some(items.limit_type().unwrap_or(TagType::Byte)),
            _ => None,
        };
        if let Some(element_type) = list_element {
            attributes.push(("limitType", element_type.name().to_owned()));
        }

        write!(self.writer, "<{}", element)?;
        for (key, value) in &attributes {
            write!(self.writer, " {}=\"{}\"", key, escape(value, true))?;
        }
        write!(self.writer, ">")?;

        self.write_payload(tag)?;

        write!(self.writer, "</{}>", element)?;
        self.state.end_tag()?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_payload(&mut self, tag: &Tag) -> Result<()> {
        let value = tag.value();
        match &*value {
            TagValue::End => Ok(()),
            TagValue::Byte(v) => self.write_text(&v.to_string()),
            TagValue::Short(v) => self.write_text(&v.to_string()),
            TagValue::Int(v) => self.write_text(&v.to_string()),
            TagValue::Long(v) => self.write_text(&v.to_string()),
            TagValue::Float(v) => self.write_text(&v.to_string()),
            TagValue::Double(v) => self.write_text(&v.to_string()),
            TagValue::String(v) => self.write_text(v),
            TagValue::ByteArray(v) => self.write_tokens(v),
            TagValue::IntArray(v) => self.write_tokens(v),
            TagValue::List(items) => {
                let element = items.limit_type().unwrap_or(TagType::Byte);
                self.state.start_list(element, Some(items.len()))?;
                for item in items.tags() {
                    self.write_tag(&item)?;
                }
                Ok(())
            }
            TagValue::Compound(children) => {
                for child in children.tags() {
                    self.write_tag(&child)?;
                }
                Ok(())
            }
        }
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        write!(self.writer, "{}", escape(text, false))?;
        Ok(())
    }

    /// Array payloads render as whitespace-separated decimal tokens.
    fn write_tokens<T: ToString>(&mut self, values: &[T]) -> Result<()> {
        let mut first = true;
        for value in values {
            if !first {
                write!(self.writer, " ")?;
            }
            write!(self.writer, "{}", value.to_string())?;
            first = false;
        }
        Ok(())
    }
}

/// True when `name` can stand alone as an XML element name.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
