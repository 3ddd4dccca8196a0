//! `application/json` parser.

use bytes::Bytes;
use serde_json::Value;

use super::{is_blank, BodyParser, Format, FormatError, ParsedValue};

/// Parses the body as a single JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl BodyParser for JsonParser {
    fn format(&self) -> Format {
        Format::Json
    }

    fn parse(&self, body: &Bytes, _content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        if is_blank(body) {
            return Err(FormatError::EmptyBody);
        }
        let value: Value = serde_json::from_slice(body).map_err(|e| FormatError::from_json(&e))?;
        Ok(ParsedValue::Json(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: &'static str) -> Result<ParsedValue, FormatError> {
        JsonParser.parse(&Bytes::from_static(body.as_bytes()), Some("application/json"))
    }

    #[test]
    fn test_parses_object() {
        let parsed = parse(r#"{"a":1}"#).unwrap();
        assert_eq!(parsed, ParsedValue::Json(json!({"a": 1})));
    }

    #[test]
    fn test_scalars_are_documents() {
        assert_eq!(parse("42").unwrap(), ParsedValue::Json(json!(42)));
        assert_eq!(parse("null").unwrap(), ParsedValue::Json(Value::Null));
    }

    #[test]
    fn test_malformed_reports_location() {
        let err = parse("{\n  \"a\":").unwrap_err();
        match &err {
            FormatError::Json { line, .. } => assert_eq!(*line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("ParseError"));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(matches!(parse("{} {}"), Err(FormatError::Json { .. })));
    }

    #[test]
    fn test_empty_and_blank_bodies() {
        assert_eq!(parse(""), Err(FormatError::EmptyBody));
        assert_eq!(parse("  \n"), Err(FormatError::EmptyBody));
    }
}
