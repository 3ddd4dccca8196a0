//! Uniform response envelope.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Format, FormatError, ParsedValue};

/// Metadata present on every envelope, plus format-specific extras.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub byte_size: usize,
    /// Declared Content-Type header, verbatim.
    pub content_type: Option<String>,
    pub expected_content_type: &'static str,
    pub content_type_mismatch: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn new(format: Format, byte_size: usize, content_type: Option<&str>, mismatch: bool) -> Self {
        Self {
            byte_size,
            content_type: content_type.map(str::to_owned),
            expected_content_type: format.expected_content_type(),
            content_type_mismatch: mismatch,
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra.extend(extra);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub format: Format,
    pub data: Option<Value>,
    pub metadata: Metadata,
    pub error: Option<String>,
}

impl Envelope {
    pub fn parsed(value: &ParsedValue, metadata: Metadata) -> Self {
        Self {
            success: true,
            format: value.format(),
            data: Some(value.data()),
            metadata: metadata.with_extra(value.metadata()),
            error: None,
        }
    }

    pub fn failed(format: Format, err: &FormatError, metadata: Metadata) -> Self {
        Self::failure(format, err.to_string(), metadata.with_extra(err.details()))
    }

    /// Failure that did not come from a parser (transport, method).
    pub fn failure(format: Format, error: String, metadata: Metadata) -> Self {
        Self {
            success: false,
            format,
            data: None,
            metadata,
            error: Some(error),
        }
    }

    /// `success`, `partial` (NDJSON with some bad lines) or `failure`.
    pub fn outcome(&self) -> &'static str {
        if !self.success {
            "failure"
        } else if self.metadata.extra.get("status").and_then(Value::as_str) == Some("partial") {
            "partial"
        } else {
            "success"
        }
    }

    /// Kind prefix of the error string, if any.
    pub fn error_kind(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(|e| e.split_once(':').map_or(e, |(kind, _)| kind))
    }
}
