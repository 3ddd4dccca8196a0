//! Parse failure taxonomy.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// 1-based location inside a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl TextPosition {
    /// Locate a byte offset. Columns count bytes from the last line feed.
    pub fn locate(body: &[u8], offset: usize) -> Self {
        let offset = offset.min(body.len());
        let prefix = &body[..offset];
        let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
        let column = match prefix.iter().rposition(|b| *b == b'\n') {
            Some(newline) => offset - newline,
            None => offset + 1,
        };
        Self { line, column }
    }
}

/// A single NDJSON line that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineError {
    /// Physical line number in the body, starting at 1.
    pub line: usize,
    pub message: String,
}

/// Errors produced by the body parsers.
///
/// The rendered message always starts with the error kind so clients can
/// match on it without parsing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("EmptyBody: request body is empty")]
    EmptyBody,

    /// Malformed JSON document.
    #[error("ParseError: {message}")]
    Json {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("MalformedMultipart: {0}")]
    MalformedMultipart(String),

    #[error("EncodingError: {0}")]
    Encoding(String),

    #[error("MalformedXML: {message}{}", describe_position(.position))]
    MalformedXml {
        message: String,
        position: Option<TextPosition>,
    },

    #[error("NotAnSVGRoot: root element is <{found}>, expected <svg>")]
    NotAnSvgRoot { found: String },

    /// Every non-blank NDJSON line failed.
    #[error("ParseError: no valid NDJSON lines ({} line(s) failed)", .errors.len())]
    NoValidLines { errors: Vec<LineError> },
}

fn describe_position(position: &Option<TextPosition>) -> String {
    match position {
        Some(p) => format!(" (line {}, column {})", p.line, p.column),
        None => String::new(),
    }
}

impl FormatError {
    pub fn malformed_xml(message: impl Into<String>, position: Option<TextPosition>) -> Self {
        Self::MalformedXml {
            message: message.into(),
            position,
        }
    }

    /// Kind name as it appears in the `error` string.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyBody => "EmptyBody",
            Self::Json { .. } | Self::NoValidLines { .. } => "ParseError",
            Self::MalformedMultipart(_) => "MalformedMultipart",
            Self::Encoding(_) => "EncodingError",
            Self::MalformedXml { .. } => "MalformedXML",
            Self::NotAnSvgRoot { .. } => "NotAnSVGRoot",
        }
    }

    /// Failure details merged into the envelope metadata.
    pub fn details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        details.insert("error_kind".into(), json!(self.kind()));
        match self {
            Self::Json { line, column, .. } => {
                details.insert("line".into(), json!(line));
                details.insert("column".into(), json!(column));
            }
            Self::MalformedXml {
                position: Some(position),
                ..
            } => {
                details.insert("line".into(), json!(position.line));
                details.insert("column".into(), json!(position.column));
            }
            Self::NotAnSvgRoot { found } => {
                details.insert("root_tag".into(), json!(found));
            }
            Self::NoValidLines { errors } => {
                details.insert("status".into(), json!("failed"));
                details.insert("lines_count".into(), json!(errors.len()));
                details.insert("valid_count".into(), json!(0));
                details.insert("error_count".into(), json!(errors.len()));
                details.insert("errors".into(), json!(errors));
            }
            _ => {}
        }
        details
    }

    pub(crate) fn from_json(err: &serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// serde_json message without its trailing " at line L column C" suffix.
pub(crate) fn json_message_without_position(err: &serde_json::Error) -> String {
    let full = err.to_string();
    let suffix = format!(" at line {} column {}", err.line(), err.column());
    match full.strip_suffix(&suffix) {
        Some(message) => format!("{message} at column {}", err.column()),
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_position() {
        let body = b"<a>\n  <b>\n</a>";
        assert_eq!(TextPosition::locate(body, 0), TextPosition { line: 1, column: 1 });
        assert_eq!(TextPosition::locate(body, 6), TextPosition { line: 2, column: 3 });
        // Offsets past the end clamp to the body length.
        assert_eq!(TextPosition::locate(body, 999).line, 3);
    }

    #[test]
    fn test_error_display_starts_with_kind() {
        let errors = vec![
            FormatError::EmptyBody,
            FormatError::MalformedMultipart("x".into()),
            FormatError::Encoding("x".into()),
            FormatError::malformed_xml("x", None),
            FormatError::NotAnSvgRoot { found: "rect".into() },
            FormatError::NoValidLines { errors: vec![] },
        ];
        for err in errors {
            assert!(err.to_string().starts_with(err.kind()), "{err}");
        }
    }

    #[test]
    fn test_xml_error_position_rendering() {
        let err = FormatError::malformed_xml(
            "unclosed element <a>",
            Some(TextPosition { line: 3, column: 7 }),
        );
        assert_eq!(
            err.to_string(),
            "MalformedXML: unclosed element <a> (line 3, column 7)"
        );
        let details = err.details();
        assert_eq!(details["line"], 3);
        assert_eq!(details["error_kind"], "MalformedXML");
    }

    #[test]
    fn test_json_error_carries_location() {
        let err = serde_json::from_str::<Value>("{\"a\":").unwrap_err();
        let converted = FormatError::from_json(&err);
        assert!(converted.to_string().starts_with("ParseError: "));
        assert_eq!(converted.details()["line"], 1);
    }

    #[test]
    fn test_line_message_drops_document_line() {
        let err = serde_json::from_str::<Value>("badline").unwrap_err();
        let message = json_message_without_position(&err);
        assert!(message.starts_with("expected value"));
        assert!(!message.contains("line"));
    }
}
