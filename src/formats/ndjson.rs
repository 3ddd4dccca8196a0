//! `application/x-ndjson` parser.
//!
//! Each non-blank line is an independent JSON document. A bad line is
//! recorded and skipped; the batch only fails when no line parses.

use bytes::Bytes;
use serde_json::Value;

use super::error::json_message_without_position;
use super::{BodyParser, Format, FormatError, LineError, ParsedValue};

/// Parsed lines plus the lines that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct NdjsonBatch {
    pub values: Vec<Value>,
    pub errors: Vec<LineError>,
    /// Non-blank lines seen.
    pub lines_count: usize,
}

impl NdjsonBatch {
    /// `complete` when every line parsed, `partial` otherwise.
    pub fn status(&self) -> &'static str {
        if self.errors.is_empty() {
            "complete"
        } else {
            "partial"
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonParser;

impl BodyParser for NdjsonParser {
    fn format(&self) -> Format {
        Format::Ndjson
    }

    fn parse(&self, body: &Bytes, _content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        let mut values = Vec::new();
        let mut errors = Vec::new();
        let mut lines_count = 0;

        for (index, raw) in body.split(|b| *b == b'\n').enumerate() {
            let line = raw.strip_suffix(b"\r").unwrap_or(raw);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            lines_count += 1;
            match serde_json::from_slice::<Value>(line) {
                Ok(value) => values.push(value),
                Err(e) => errors.push(LineError {
                    line: index + 1,
                    message: json_message_without_position(&e),
                }),
            }
        }

        if lines_count == 0 {
            return Err(FormatError::EmptyBody);
        }
        if values.is_empty() {
            return Err(FormatError::NoValidLines { errors });
        }
        Ok(ParsedValue::Ndjson(NdjsonBatch {
            values,
            errors,
            lines_count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: &'static str) -> Result<ParsedValue, FormatError> {
        NdjsonParser.parse(&Bytes::from_static(body.as_bytes()), Some("application/x-ndjson"))
    }

    fn batch(body: &'static str) -> NdjsonBatch {
        match parse(body).unwrap() {
            ParsedValue::Ndjson(batch) => batch,
            other => panic!("expected ndjson, got {other:?}"),
        }
    }

    #[test]
    fn test_all_lines_parse() {
        let batch = batch("{\"x\":1}\n{\"x\":2}\n");
        assert_eq!(batch.values, vec![json!({"x": 1}), json!({"x": 2})]);
        assert_eq!(batch.status(), "complete");
        assert_eq!(batch.lines_count, 2);
    }

    #[test]
    fn test_partial_success_keeps_good_lines() {
        let batch = batch("{\"x\":1}\n{\"x\":2}\nbadline\n");
        assert_eq!(batch.values, vec![json!({"x": 1}), json!({"x": 2})]);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].line, 3);
        assert_eq!(batch.status(), "partial");
    }

    #[test]
    fn test_blank_lines_are_skipped_but_numbering_is_physical() {
        let batch = batch("\r\n{\"a\":true}\r\n\n   \n{oops}\n");
        assert_eq!(batch.values, vec![json!({"a": true})]);
        assert_eq!(batch.lines_count, 2);
        assert_eq!(batch.errors[0].line, 5);
    }

    #[test]
    fn test_no_valid_lines_fails() {
        match parse("nope\n{\n") {
            Err(FormatError::NoValidLines { errors }) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].line, 1);
                assert_eq!(errors[1].line, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(parse(""), Err(FormatError::EmptyBody));
        assert_eq!(parse("\n\n  \n"), Err(FormatError::EmptyBody));
    }

    #[test]
    fn test_last_line_without_newline() {
        let batch = batch("[1]\n[2]");
        assert_eq!(batch.values, vec![json!([1]), json!([2])]);
    }
}
