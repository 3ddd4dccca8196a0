//! `text/plain` parser.

use bytes::Bytes;
use mime::Mime;

use super::{BodyParser, Format, FormatError, ParsedValue};

/// Character encodings understood by the text parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
    Latin1,
}

impl Charset {
    /// Resolve the `charset` parameter of a declared content type.
    /// A missing header or parameter means UTF-8.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, FormatError> {
        let declared = content_type
            .and_then(|ct| ct.parse::<Mime>().ok())
            .and_then(|parsed| {
                parsed
                    .get_param(mime::CHARSET)
                    .map(|c| c.as_str().to_ascii_lowercase())
            });

        match declared.as_deref() {
            None | Some("utf-8") | Some("utf8") => Ok(Charset::Utf8),
            Some("us-ascii") | Some("ascii") => Ok(Charset::Ascii),
            Some("iso-8859-1") | Some("latin1") | Some("latin-1") => Ok(Charset::Latin1),
            Some(other) => Err(FormatError::Encoding(format!("unsupported charset {other:?}"))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Ascii => "us-ascii",
            Charset::Latin1 => "iso-8859-1",
        }
    }

    pub fn decode(self, body: &[u8]) -> Result<String, FormatError> {
        match self {
            Charset::Utf8 => decode_utf8(body),
            Charset::Ascii => match body.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(FormatError::Encoding(format!(
                    "byte 0x{:02x} at offset {offset} is not valid us-ascii",
                    body[offset]
                ))),
                None => decode_utf8(body),
            },
            Charset::Latin1 => Ok(body.iter().map(|b| char::from(*b)).collect()),
        }
    }
}

/// Strict UTF-8 decoding shared by the text-like parsers.
pub(crate) fn decode_utf8(body: &[u8]) -> Result<String, FormatError> {
    std::str::from_utf8(body)
        .map(str::to_owned)
        .map_err(|e| {
            FormatError::Encoding(format!(
                "invalid utf-8 sequence at byte offset {}",
                e.valid_up_to()
            ))
        })
}

/// Decoded text and the charset used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextData {
    pub text: String,
    pub charset: Charset,
}

/// Returns the body verbatim as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl BodyParser for TextParser {
    fn format(&self) -> Format {
        Format::Text
    }

    fn parse(&self, body: &Bytes, content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        let charset = Charset::from_content_type(content_type)?;
        let text = charset.decode(body)?;
        Ok(ParsedValue::Text(TextData { text, charset }))
    }
}
