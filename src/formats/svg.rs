//! `image/svg+xml` parser: an XML document whose root is `<svg>`.

use bytes::Bytes;
use serde::Serialize;

use super::text::decode_utf8;
use super::xml::XmlParser;
use super::{BodyParser, Format, FormatError, ParsedValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SvgDocument {
    pub svg: String,
    pub root_tag: String,
    pub root_confirmed: bool,
    pub width: Option<String>,
    pub height: Option<String>,
    pub view_box: Option<String>,
    #[serde(skip)]
    pub element_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SvgParser {
    xml: XmlParser,
}

impl SvgParser {
    pub fn new(xml: XmlParser) -> Self {
        Self { xml }
    }
}

impl BodyParser for SvgParser {
    fn format(&self) -> Format {
        Format::Svg
    }

    fn parse(&self, body: &Bytes, _content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        let doc = self.xml.parse_document(body)?;
        let root = &doc.element;
        if root.local_name() != "svg" {
            return Err(FormatError::NotAnSvgRoot {
                found: root.name.clone(),
            });
        }
        let attribute = |key: &str| root.attributes.get(key).cloned();
        Ok(ParsedValue::Svg(SvgDocument {
            svg: decode_utf8(body)?,
            root_tag: root.name.clone(),
            root_confirmed: true,
            width: attribute("width"),
            height: attribute("height"),
            view_box: attribute("viewBox"),
            element_count: doc.stats.element_count,
        }))
    }
}
