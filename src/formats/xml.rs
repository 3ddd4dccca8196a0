//! `application/xml` parser.
//!
//! # Responsibilities
//! - Enforce well-formedness: one root, matched tags, known entities, UTF-8
//! - Build a small element tree for the response
//!
//! # Design Decisions
//! - DOCTYPE declarations are skipped, never interpreted. Only the five
//!   predefined entities and character references are expanded, so an
//!   external or recursive entity is rejected as unknown and no I/O happens
//! - Nesting depth is capped, for self-closing elements too
//! - quick-xml does not check the XML character set or name grammar, so both
//!   are checked here

use std::borrow::Cow;

use bytes::Bytes;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use super::{is_blank, BodyParser, Format, FormatError, ParsedValue, TextPosition};

/// One element of the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlElement {
    pub name: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Name without a namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlStats {
    pub element_count: usize,
    pub attribute_count: usize,
    pub max_depth: usize,
}

/// A well-formed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XmlDocument {
    pub root_tag: String,
    /// Direct children of the root: tag → text. Later duplicates win.
    pub fields: IndexMap<String, Option<String>>,
    pub element: XmlElement,
    #[serde(skip)]
    pub stats: XmlStats,
}

impl XmlDocument {
    fn new(root: XmlElement, stats: XmlStats) -> Self {
        let fields = root
            .children
            .iter()
            .map(|child| (child.name.clone(), child.text.clone()))
            .collect();
        Self {
            root_tag: root.name.clone(),
            fields,
            element: root,
            stats,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct XmlParser {
    max_depth: usize,
}

impl XmlParser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Parse and validate a document. Shared with the SVG parser.
    pub fn parse_document(&self, body: &[u8]) -> Result<XmlDocument, FormatError> {
        if is_blank(body) {
            return Err(FormatError::EmptyBody);
        }
        let source = std::str::from_utf8(body).map_err(|e| {
            FormatError::malformed_xml(
                "invalid utf-8 sequence",
                Some(TextPosition::locate(body, e.valid_up_to())),
            )
        })?;
        if let Some((offset, c)) = source.char_indices().find(|(_, c)| !is_xml_char(*c)) {
            return Err(FormatError::malformed_xml(
                format!("character {c:?} is not allowed in XML"),
                Some(TextPosition::locate(body, offset)),
            ));
        }

        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);

        let at = |offset: u64| Some(TextPosition::locate(body, usize::try_from(offset).unwrap_or(usize::MAX)));

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut stats = XmlStats::default();

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(FormatError::malformed_xml(
                        e.to_string(),
                        at(reader.error_position()),
                    ))
                }
            };
            let position = reader.buffer_position();

            match event {
                Event::Decl(decl) => {
                    if let Some(Ok(encoding)) = decl.encoding() {
                        let encoding = String::from_utf8_lossy(&encoding).to_ascii_lowercase();
                        if !matches!(encoding.as_str(), "utf-8" | "utf8" | "us-ascii" | "ascii") {
                            return Err(FormatError::malformed_xml(
                                format!("declared encoding {encoding:?} does not match the utf-8 body"),
                                at(position),
                            ));
                        }
                    }
                }
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(FormatError::malformed_xml("multiple root elements", at(position)));
                    }
                    let element = open_element(&start, &mut stats).map_err(|m| FormatError::malformed_xml(m, at(position)))?;
                    stack.push(element);
                    if stack.len() > self.max_depth {
                        return Err(FormatError::malformed_xml(
                            format!("nesting deeper than {} elements", self.max_depth),
                            at(position),
                        ));
                    }
                    stats.max_depth = stats.max_depth.max(stack.len());
                }
                Event::Empty(start) => {
                    if root.is_some() {
                        return Err(FormatError::malformed_xml("multiple root elements", at(position)));
                    }
                    let element = open_element(&start, &mut stats).map_err(|m| FormatError::malformed_xml(m, at(position)))?;
                    if stack.len() + 1 > self.max_depth {
                        return Err(FormatError::malformed_xml(
                            format!("nesting deeper than {} elements", self.max_depth),
                            at(position),
                        ));
                    }
                    stats.max_depth = stats.max_depth.max(stack.len() + 1);
                    close_element(element, &mut stack, &mut root);
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => close_element(element, &mut stack, &mut root),
                    None => {
                        return Err(FormatError::malformed_xml("unexpected end tag", at(position)));
                    }
                },
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| FormatError::malformed_xml(e.to_string(), at(position)))?;
                    check_chars(&text).map_err(|m| FormatError::malformed_xml(m, at(position)))?;
                    append_text(&text, &mut stack).map_err(|m| FormatError::malformed_xml(m, at(position)))?;
                }
                Event::CData(cdata) => {
                    let raw = cdata.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    append_text(&text, &mut stack).map_err(|m| FormatError::malformed_xml(m, at(position)))?;
                }
                Event::Eof => break,
                // Comments, processing instructions and DOCTYPE carry no data.
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(FormatError::malformed_xml(
                format!("unclosed element <{}>", open.name),
                Some(TextPosition::locate(body, body.len())),
            ));
        }
        match root {
            Some(root) => Ok(XmlDocument::new(root, stats)),
            None => Err(FormatError::malformed_xml("no root element", None)),
        }
    }
}

impl BodyParser for XmlParser {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn parse(&self, body: &Bytes, _content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        self.parse_document(body).map(ParsedValue::Xml)
    }
}

fn open_element(start: &BytesStart<'_>, stats: &mut XmlStats) -> Result<XmlElement, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    check_name(&name)?;
    let mut attributes = IndexMap::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        check_name(&key)?;
        let value = attribute.unescape_value().map_err(|e| e.to_string())?;
        // Character references can still produce forbidden characters.
        check_chars(&value)?;
        attributes.insert(key, value.into_owned());
    }
    stats.element_count += 1;
    stats.attribute_count += attributes.len();
    Ok(XmlElement {
        name,
        attributes,
        text: None,
        children: Vec::new(),
    })
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn check_chars(text: &str) -> Result<(), String> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(format!("character {c:?} is not allowed in XML")),
        None => Ok(()),
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

/// Names must start with a letter, `_` or `:`.
fn check_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char);
    if valid {
        Ok(())
    } else {
        Err(format!("invalid name {name:?}"))
    }
}

fn close_element(element: XmlElement, stack: &mut [XmlElement], root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn append_text(text: &Cow<'_, str>, stack: &mut [XmlElement]) -> Result<(), String> {
    match stack.last_mut() {
        Some(element) => {
            element.push_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("text outside the root element".to_string()),
    }
}
