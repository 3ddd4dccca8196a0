//! `application/octet-stream` parser. Never fails on content.

use bytes::Bytes;
use serde::Serialize;

use super::{BodyParser, Format, FormatError, ParsedValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryData {
    pub size: usize,
    /// Leading bytes as integers.
    pub first_bytes: Vec<u8>,
    #[serde(skip)]
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryParser {
    preview_len: usize,
}

impl BinaryParser {
    pub fn new(preview_len: usize) -> Self {
        Self { preview_len }
    }
}

impl BodyParser for BinaryParser {
    fn format(&self) -> Format {
        Format::Binary
    }

    fn parse(&self, body: &Bytes, _content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        let preview = body.len().min(self.preview_len);
        Ok(ParsedValue::Binary(BinaryData {
            size: body.len(),
            first_bytes: body[..preview].to_vec(),
            bytes: body.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(parser: BinaryParser, body: &'static [u8]) -> BinaryData {
        match parser.parse(&Bytes::from_static(body), None) {
            Ok(ParsedValue::Binary(data)) => data,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body() {
        let data = parse(BinaryParser::new(10), b"");
        assert_eq!(data.size, 0);
        assert!(data.first_bytes.is_empty());
    }

    #[test]
    fn test_preview_is_capped() {
        let data = parse(BinaryParser::new(4), &[0, 1, 2, 3, 4, 5, 255]);
        assert_eq!(data.size, 7);
        assert_eq!(data.first_bytes, vec![0, 1, 2, 3]);
        assert_eq!(&data.bytes[..], &[0, 1, 2, 3, 4, 5, 255]);
    }

    #[test]
    fn test_serialized_shape_omits_payload() {
        let data = parse(BinaryParser::new(10), b"\x89PNG");
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value, serde_json::json!({"size": 4, "first_bytes": [137, 80, 78, 71]}));
    }
}
