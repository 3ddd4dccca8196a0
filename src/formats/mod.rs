//! Content-type dispatch and body parsing.
//!
//! # Data Flow
//! ```text
//! route (fixes the Format) + declared Content-Type + buffered body
//!     → dispatcher.rs (pick parser, flag content-type mismatch)
//!     → <format>.rs (decode + well-formedness checks)
//!     → ParsedValue | FormatError
//!     → envelope.rs (uniform success/data/metadata/error shape)
//! ```
//!
//! # Design Decisions
//! - Routes are format-specific, not content-negotiated: a mismatched
//!   Content-Type is flagged in metadata, never rejected
//! - Parsers are synchronous and pure over an in-memory buffer
//! - Every failure becomes an envelope; nothing escapes to the transport

pub mod binary;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod html;
pub mod json;
pub mod multipart;
pub mod ndjson;
pub mod svg;
pub mod text;
pub mod urlencoded;
pub mod value;
pub mod xml;

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

pub use dispatcher::Dispatcher;
pub use envelope::{Envelope, Metadata};
pub use error::{FormatError, LineError, TextPosition};
pub use value::ParsedValue;

/// The nine body encodings, one per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Multipart,
    UrlEncoded,
    Text,
    Binary,
    Xml,
    Html,
    Svg,
    Ndjson,
}

impl Format {
    /// All formats in route-table order.
    pub const ALL: [Format; 9] = [
        Format::Json,
        Format::Multipart,
        Format::UrlEncoded,
        Format::Text,
        Format::Binary,
        Format::Xml,
        Format::Html,
        Format::Svg,
        Format::Ndjson,
    ];

    /// Tag used in the envelope `format` field.
    pub fn tag(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Multipart => "multipart",
            Format::UrlEncoded => "urlencoded",
            Format::Text => "text",
            Format::Binary => "binary",
            Format::Xml => "xml",
            Format::Html => "html",
            Format::Svg => "svg",
            Format::Ndjson => "ndjson",
        }
    }

    pub fn route(self) -> &'static str {
        match self {
            Format::Json => "/api/json/",
            Format::Multipart => "/api/multipart/",
            Format::UrlEncoded => "/api/urlencoded/",
            Format::Text => "/api/text/",
            Format::Binary => "/api/binary/",
            Format::Xml => "/api/xml/",
            Format::Html => "/api/html/",
            Format::Svg => "/api/svg/",
            Format::Ndjson => "/api/ndjson/",
        }
    }

    pub fn expected_content_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Multipart => "multipart/form-data",
            Format::UrlEncoded => "application/x-www-form-urlencoded",
            Format::Text => "text/plain",
            Format::Binary => "application/octet-stream",
            Format::Xml => "application/xml",
            Format::Html => "text/html",
            Format::Svg => "image/svg+xml",
            Format::Ndjson => "application/x-ndjson",
        }
    }

    /// Media type essences accepted without a mismatch flag.
    pub fn accepted_content_types(self) -> &'static [&'static str] {
        match self {
            Format::Json => &["application/json"],
            Format::Multipart => &["multipart/form-data"],
            Format::UrlEncoded => &["application/x-www-form-urlencoded"],
            Format::Text => &["text/plain"],
            Format::Binary => &["application/octet-stream"],
            Format::Xml => &["application/xml", "text/xml"],
            Format::Html => &["text/html"],
            Format::Svg => &["image/svg+xml"],
            Format::Ndjson => &[
                "application/x-ndjson",
                "application/ndjson",
                "application/jsonl",
            ],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A parsing strategy bound to one format.
pub trait BodyParser: Send + Sync + fmt::Debug {
    fn format(&self) -> Format;

    /// Parse a fully buffered body. `content_type` is the raw declared header.
    fn parse(&self, body: &Bytes, content_type: Option<&str>) -> Result<ParsedValue, FormatError>;
}

/// True for an empty body or one made only of ASCII whitespace.
pub(crate) fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}
