//! A minimal XML pull parser.
//!
//! Covers the subset of XML the codec emits and must tolerate: elements with
//! attributes, character data with entity references, self-closing elements,
//! the XML declaration, comments, and a DOCTYPE line. The whole input is
//! materialized up front, like the documents themselves.

use std::io::Read;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StartElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl StartElement {
    /// The attribute's value, if the attribute is present. An empty value
    /// is still present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlEvent {
    Start(StartElement),
    End(String),
    Text(String),
    Eof,
}

pub(crate) struct XmlPullParser {
    chars: Vec<char>,
    pos: usize,
    /// End event synthesized for a self-closing element, so `<e/>` reads
    /// exactly like `<e></e>`.
    pending_end: Option<String>,
    peeked: Option<XmlEvent>,
}

impl XmlPullParser {
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let text = String::from_utf8(data).map_err(|e| Error::nonunicode(e.as_bytes()))?;
        Ok(Self {
            chars: text.chars().collect(),
            pos: 0,
            pending_end: None,
            peeked: None,
        })
    }

    pub fn next(&mut self) -> Result<XmlEvent> {
        match self.peeked.take() {
            Some(event) => Ok(event),
            None => self.read_event(),
        }
    }

    pub fn peek(&mut self) -> Result<XmlEvent> {
        if let Some(event) = &self.peeked {
            return Ok(event.clone());
        }
        let event = self.read_event()?;
        self.peeked = Some(event.clone());
        Ok(event)
    }

    fn read_event(&mut self) -> Result<XmlEvent> {
        if let Some(name) = self.pending_end.take() {
            return Ok(XmlEvent::End(name));
        }

        loop {
            if self.pos >= self.chars.len() {
                return Ok(XmlEvent::Eof);
            }

            if self.current() != '<' {
                return self.read_text();
            }

            if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.starts_with("<!") {
                self.skip_until(">")?;
            } else if self.starts_with("</") {
                return self.read_end_element();
            } else {
                return self.read_start_element();
            }
        }
    }

    fn read_text(&mut self) -> Result<XmlEvent> {
        let start = self.pos;
        while self.pos < self.chars.len() && self.current() != '<' {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        Ok(XmlEvent::Text(decode_entities(&raw)?))
    }

    fn read_end_element(&mut self) -> Result<XmlEvent> {
        self.pos += 2; // "</"
        let name = self.read_name()?;
        self.skip_whitespace();
        self.expect('>')?;
        Ok(XmlEvent::End(name))
    }

    fn read_start_element(&mut self) -> Result<XmlEvent> {
        self.pos += 1; // "<"
        let name = self.read_name()?;
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            match self.current_checked()? {
                '>' => {
                    self.pos += 1;
                    break;
                }
                '/' => {
                    self.pos += 1;
                    self.expect('>')?;
                    self.pending_end = Some(name.clone());
                    break;
                }
                _ => attributes.push(self.read_attribute()?),
            }
        }

        Ok(XmlEvent::Start(StartElement { name, attributes }))
    }

    fn read_attribute(&mut self) -> Result<(String, String)> {
        let name = self.read_name()?;
        self.skip_whitespace();
        self.expect('=')?;
        self.skip_whitespace();

        let quote = self.current_checked()?;
        if quote != '"' && quote != '\'' {
            return Err(Error::malformed(format!(
                "expected a quoted value for attribute {:?}",
                name
            )));
        }
        self.pos += 1;

        let start = self.pos;
        while self.pos < self.chars.len() && self.current() != quote {
            self.pos += 1;
        }
        if self.pos >= self.chars.len() {
            return Err(Error::malformed(format!(
                "unterminated value for attribute {:?}",
                name
            )));
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1; // closing quote

        Ok((name, decode_entities(&raw)?))
    }

    fn read_name(&mut self) -> Result<String> {
        let start = self.pos;
        while self.pos < self.chars.len() && is_name_char(self.current()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(Error::malformed("expected an XML name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.chars.len() && self.current().is_whitespace() {
            self.pos += 1;
        }
    }

    fn skip_until(&mut self, terminator: &str) -> Result<()> {
        let needle: Vec<char> = terminator.chars().collect();
        while self.pos < self.chars.len() {
            if self.chars[self.pos..].starts_with(&needle) {
                self.pos += needle.len();
                return Ok(());
            }
            self.pos += 1;
        }
        Err(Error::malformed(format!(
            "unterminated markup, expected {:?}",
            terminator
        )))
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.current_checked()? != expected {
            return Err(Error::malformed(format!(
                "expected {:?} in markup",
                expected
            )));
        }
        self.pos += 1;
        Ok(())
    }

    fn current(&self) -> char {
        self.chars[self.pos]
    }

    fn current_checked(&self) -> Result<char> {
        self.chars
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::malformed("unexpected end of document inside markup"))
    }

    fn starts_with(&self, prefix: &str) -> bool {
        let needle: Vec<char> = prefix.chars().collect();
        self.chars[self.pos..].starts_with(&needle)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn decode_entities(raw: &str) -> Result<String> {
    if !raw.contains('&') {
        return Ok(raw.to_owned());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest
            .find(';')
            .ok_or_else(|| Error::malformed("unterminated entity reference"))?;
        let entity = &rest[1..semi];
        match entity {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => out.push(parse_char_reference(entity)?),
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn parse_char_reference(entity: &str) -> Result<char> {
    let code = match entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => match entity.strip_prefix('#') {
            Some(dec) => dec.parse().ok(),
            None => None,
        },
    };
    code.and_then(char::from_u32)
        .ok_or_else(|| Error::malformed(format!("unrecognized entity reference {:?}", entity)))
}
