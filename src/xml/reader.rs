use std::io::Read;

use crate::error::{Error, Result};
use crate::state::TagState;
use crate::tag::{Tag, TagCollection, TagDictionary, TagValue};
use crate::TagType;

use super::parser::{StartElement, XmlEvent, XmlPullParser};

/// Reads a tag tree from its XML representation.
///
/// Tolerates documents with or without inter-element whitespace, comments,
/// an XML declaration, and self-closing empty elements. Termination is
/// driven by the element structure and the shared `TagState` stack, so
/// empty roots and empty lists read cleanly.
pub struct XmlTagReader {
    parser: XmlPullParser,
    state: TagState,
}

impl XmlTagReader {
    /// Buffers the whole source up front; the constructor fails on I/O
    /// errors or a source that is not UTF-8 text.
    pub fn new<R: Read>(reader: R) -> Result<Self> {
        Ok(Self {
            parser: XmlPullParser::from_reader(reader)?,
            state: TagState::new(),
        })
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
        self.read_tag_with(None)
    }

    /// True when the document opens with a Compound-typed root element.
    /// Never fails; a source that is not even XML answers `false`.
    pub fn is_nbt_document(&mut self) -> bool {
        matches!(self.peek_root(), Ok(start) if root_type(&start) == Some(TagType::Compound))
    }

    /// The declared name of the root tag, without materializing anything
    /// below it.
    pub fn read_root_name(&mut self) -> Result<String> {
        let start = self.peek_root()?;
        if root_type(&start) != Some(TagType::Compound) {
            return Err(Error::malformed("document root is not a compound tag"));
        }
        Ok(tag_name(&start))
    }

    fn peek_root(&mut self) -> Result<StartElement> {
        loop {
            match self.parser.peek()? {
                XmlEvent::Text(text) if text.trim().is_empty() => {
                    self.parser.next()?;
                }
                XmlEvent::Start(start) => return Ok(start),
                _ => return Err(Error::malformed("expected a root element")),
            }
        }
    }

    /// Reads one element as a tag. Inside a list the element's type is
    /// implied by the list header; everywhere else it comes from the `type`
    /// attribute.
    fn read_tag_with(&mut self, implied: Option<TagType>) -> Result<Tag> {
        let start = self.next_start()?;

        let kind = match implied {
            Some(kind) => kind,
            None => match start.attribute("type") {
                Some(token) => parse_type_token(token)?,
                None => return Err(Error::missing_attribute("type")),
            },
        };

        let prev = self.state.start_tag(kind)?;
        let in_list = prev.map(|ctx| ctx.is_list()).unwrap_or(false);

        // List children are unnamed regardless of what the markup claims.
        let name = if in_list { String::new() } else { tag_name(&start) };

        let value = match kind {
            TagType::End => return Err(Error::unknown_type_token("End")),
            TagType::Byte => TagValue::Byte(self.read_scalar(&start.name)?),
            TagType::Short => TagValue::Short(self.read_scalar(&start.name)?),
            TagType::Int => TagValue::Int(self.read_scalar(&start.name)?),
            TagType::Long => TagValue::Long(self.read_scalar(&start.name)?),
            TagType::Float => TagValue::Float(self.read_scalar(&start.name)?),
            TagType::Double => TagValue::Double(self.read_scalar(&start.name)?),
            TagType::String => TagValue::String(self.read_content(&start.name)?),
            TagType::ByteArray => TagValue::ByteArray(self.read_tokens(&start.name)?),
            TagType::IntArray => TagValue::IntArray(self.read_tokens(&start.name)?),
            TagType::List => TagValue::List(self.read_list(&start)?),
            TagType::Compound => TagValue::Compound(self.read_compound(&start)?),
        };

        self.state.end_tag()?;
        Ok(Tag::with_name_value(name, value))
    }

    fn read_list(&mut self, start: &StartElement) -> Result<TagCollection> {
        let element = match start.attribute("limitType") {
            Some(token) => parse_type_token(token)?,
            None => return Err(Error::missing_attribute("limitType")),
        };
        self.state.start_list(element, None)?;

        let mut items = TagCollection::with_limit(element);
        while self.next_child(&start.name)? {
            let child = self.read_tag_with(Some(element))?;
            items.push_orphan(child);
        }
        Ok(items)
    }

    fn read_compound(&mut self, start: &StartElement) -> Result<TagDictionary> {
        let mut children = TagDictionary::new();
        while self.next_child(&start.name)? {
            let child = self.read_tag_with(None)?;
            let name = child.name();
            children
                .insert_orphan(child)
                .map_err(|_| Error::malformed(format!("duplicate tag name {:?} in compound", name)))?;
        }
        Ok(children)
    }

    fn read_scalar<T: std::str::FromStr>(&mut self, element: &str) -> Result<T> {
        let content = self.read_content(element)?;
        let trimmed = content.trim();
        trimmed
            .parse()
            .map_err(|_| Error::malformed(format!("invalid {} value {:?}", element, trimmed)))
    }

    fn read_tokens<T: std::str::FromStr>(&mut self, element: &str) -> Result<Vec<T>> {
        let content = self.read_content(element)?;
        content
            .split_whitespace()
            .map(|token| {
                token
                    .parse()
                    .map_err(|_| Error::malformed(format!("invalid array value {:?}", token)))
            })
            .collect()
    }

    /// Consumes everything up to this element's end tag, concatenating
    /// character data. Nested markup inside a scalar is malformed.
    fn read_content(&mut self, element: &str) -> Result<String> {
        let mut content = String::new();
        loop {
            match self.parser.next()? {
                XmlEvent::Text(text) => content.push_str(&text),
                XmlEvent::End(name) if name == element => return Ok(content),
                XmlEvent::End(name) => {
                    return Err(Error::malformed(format!(
                        "mismatched end tag {:?} inside {:?}",
                        name, element
                    )))
                }
                XmlEvent::Start(_) => {
                    return Err(Error::malformed(format!(
                        "unexpected child element inside {:?}",
                        element
                    )))
                }
                XmlEvent::Eof => {
                    return Err(Error::malformed("unexpected end of document"))
                }
            }
        }
    }

    /// Steps to the next child element of a container, skipping whitespace.
    /// Returns `false` once the container's end tag has been consumed.
    fn next_child(&mut self, element: &str) -> Result<bool> {
        loop {
            match self.parser.peek()? {
                XmlEvent::Text(text) if text.trim().is_empty() => {
                    self.parser.next()?;
                }
                XmlEvent::Text(_) => {
                    return Err(Error::malformed(format!(
                        "unexpected character data inside {:?}",
                        element
                    )))
                }
                XmlEvent::Start(_) => return Ok(true),
                XmlEvent::End(name) if name == element => {
                    self.parser.next()?;
                    return Ok(false);
                }
                XmlEvent::End(name) => {
                    return Err(Error::malformed(format!(
                        "mismatched end tag {:?} inside {:?}",
                        name, element
                    )))
                }
                XmlEvent::Eof => {
                    return Err(Error::malformed("unexpected end of document"))
                }
            }
        }
    }

    /// The next start element, skipping whitespace-only character data.
    fn next_start(&mut self) -> Result<StartElement> {
        loop {
            match self.parser.next()? {
                XmlEvent::Text(text) if text.trim().is_empty() => {}
                XmlEvent::Start(start) => return Ok(start),
                XmlEvent::Text(_) => {
                    return Err(Error::malformed("unexpected character data, expected an element"))
                }
                XmlEvent::End(name) => {
                    return Err(Error::malformed(format!("unexpected end tag {:?}", name)))
                }
                XmlEvent::Eof => {
                    return Err(Error::malformed("unexpected end of document"))
                }
            }
        }
    }
}

/// A tag's name: the `name` attribute when present (even when empty),
/// otherwise the element's own name.
fn tag_name(start: &StartElement) -> String {
    match start.attribute("name") {
        Some(name) => name.to_owned(),
        None => start.name.clone(),
    }
}

fn root_type(start: &StartElement) -> Option<TagType> {
    start.attribute("type").and_then(TagType::from_name)
}

/// Parses a `type`/`limitType` token, ignoring case. `End` never appears as
/// a readable element type.
fn parse_type_token(token: &str) -> Result<TagType> {
    match TagType::from_name(token) {
        Some(TagType::End) | None => Err(Error::unknown_type_token(token)),
        Some(kind) => Ok(kind),
    }
}
