//! `application/x-www-form-urlencoded` parser.

use bytes::Bytes;
use indexmap::IndexMap;

use super::{BodyParser, Format, FormatError, ParsedValue};

/// Decodes `key=value&...` pairs.
///
/// Percent-decoding is lenient: invalid escapes pass through literally and
/// invalid UTF-8 is replaced, so a form body never fails to parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncodedParser;

impl BodyParser for UrlEncodedParser {
    fn format(&self) -> Format {
        Format::UrlEncoded
    }

    fn parse(&self, body: &Bytes, _content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| FormatError::Encoding(e.to_string()))?;

        let mut form: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in pairs {
            form.entry(key).or_default().push(value);
        }
        Ok(ParsedValue::UrlEncoded(form))
    }
}
