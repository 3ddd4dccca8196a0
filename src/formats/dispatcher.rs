//! Route → parser dispatch.
//!
//! # Responsibilities
//! - Hold one parser per format, built once from config
//! - Compare the declared Content-Type with the route's expectation
//! - Turn every parse result into an envelope
//!
//! # Design Decisions
//! - Mismatches are flagged, not rejected: clients posting `text/plain` to
//!   the JSON route still get their body parsed as JSON
//! - Only the media type essence is compared; parameters are ignored

use bytes::Bytes;
use mime::Mime;

use super::binary::BinaryParser;
use super::html::HtmlParser;
use super::json::JsonParser;
use super::multipart::MultipartParser;
use super::ndjson::NdjsonParser;
use super::svg::SvgParser;
use super::text::TextParser;
use super::urlencoded::UrlEncodedParser;
use super::xml::XmlParser;
use super::{BodyParser, Envelope, Format, Metadata};
use crate::config::LimitsConfig;

/// Fixed table of parsers indexed by [`Format`].
#[derive(Debug)]
pub struct Dispatcher {
    parsers: Vec<Box<dyn BodyParser>>,
}

impl Dispatcher {
    pub fn new(limits: &LimitsConfig) -> Self {
        let xml = XmlParser::new(limits.xml_max_depth);
        let parsers = Format::ALL
            .iter()
            .map(|format| -> Box<dyn BodyParser> {
                match format {
                    Format::Json => Box::new(JsonParser),
                    Format::Multipart => Box::new(MultipartParser::new(
                        limits.multipart_max_fields,
                        limits.multipart_max_field_size,
                    )),
                    Format::UrlEncoded => Box::new(UrlEncodedParser),
                    Format::Text => Box::new(TextParser),
                    Format::Binary => Box::new(BinaryParser::new(limits.binary_preview_bytes)),
                    Format::Xml => Box::new(xml),
                    Format::Html => Box::new(HtmlParser),
                    Format::Svg => Box::new(SvgParser::new(xml)),
                    Format::Ndjson => Box::new(NdjsonParser),
                }
            })
            .collect();
        Self { parsers }
    }

    pub fn parser(&self, format: Format) -> &dyn BodyParser {
        self.parsers[format.index()].as_ref()
    }

    /// Parse `body` under the route's format. Always returns an envelope.
    pub fn dispatch(&self, format: Format, content_type: Option<&str>, body: &Bytes) -> Envelope {
        let mismatch = !content_type_matches(format, content_type);
        if mismatch {
            tracing::debug!(
                format = %format,
                content_type = content_type.unwrap_or("<none>"),
                "Declared content type does not match route, parsing anyway"
            );
        }
        let metadata = Metadata::new(format, body.len(), content_type, mismatch);

        match self.parser(format).parse(body, content_type) {
            Ok(value) => Envelope::parsed(&value, metadata),
            Err(err) => Envelope::failed(format, &err, metadata),
        }
    }
}

/// True when the declared media type is one the format accepts.
pub fn content_type_matches(format: Format, content_type: Option<&str>) -> bool {
    let Some(mime) = content_type.and_then(|ct| ct.trim().parse::<Mime>().ok()) else {
        return false;
    };
    let essence = mime.essence_str().to_ascii_lowercase();
    format.accepted_content_types().contains(&essence.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(&LimitsConfig::default())
    }

    fn dispatch(format: Format, content_type: Option<&str>, body: &'static [u8]) -> Envelope {
        dispatcher().dispatch(format, content_type, &Bytes::from_static(body))
    }

    #[test]
    fn test_table_matches_formats() {
        let dispatcher = dispatcher();
        for format in Format::ALL {
            assert_eq!(dispatcher.parser(format).format(), format);
        }
    }

    #[test]
    fn test_content_type_matching() {
        assert!(content_type_matches(Format::Json, Some("application/json")));
        assert!(content_type_matches(Format::Json, Some("Application/JSON; charset=utf-8")));
        assert!(content_type_matches(Format::Xml, Some("text/xml")));
        assert!(content_type_matches(
            Format::Multipart,
            Some("multipart/form-data; boundary=abc")
        ));
        assert!(!content_type_matches(Format::Json, Some("text/plain")));
        assert!(!content_type_matches(Format::Json, Some("not a mime")));
        assert!(!content_type_matches(Format::Binary, None));
    }

    #[test]
    fn test_json_example() {
        let envelope = dispatch(Format::Json, Some("application/json"), b"{\"a\":1}\n");
        assert!(envelope.success);
        assert_eq!(envelope.data, Some(json!({"a": 1})));
        assert_eq!(envelope.metadata.byte_size, 8);
        assert!(!envelope.metadata.content_type_mismatch);

        let envelope = dispatch(Format::Json, Some("application/json"), b"{\"a\":");
        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains("ParseError"));
        assert_eq!(envelope.error_kind(), Some("ParseError"));
    }

    #[test]
    fn test_mismatch_is_flagged_not_rejected() {
        let envelope = dispatch(Format::Json, Some("text/plain"), b"[1,2]");
        assert!(envelope.success);
        assert_eq!(envelope.format, Format::Json);
        assert!(envelope.metadata.content_type_mismatch);
        assert_eq!(envelope.metadata.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_every_failure_names_its_format() {
        for format in Format::ALL {
            let envelope = dispatch(format, None, b"\xff\xfe<<<");
            assert_eq!(envelope.format, format);
            assert_eq!(envelope.success, envelope.error.is_none());
        }
    }

    #[test]
    fn test_empty_body_policies() {
        let empty_ok = [Format::UrlEncoded, Format::Text, Format::Binary, Format::Html];
        for format in Format::ALL {
            let envelope = dispatch(format, Some(format.expected_content_type()), b"");
            assert_eq!(envelope.success, empty_ok.contains(&format), "{format}");
            assert_eq!(envelope.metadata.byte_size, 0);
            if !envelope.success {
                assert_eq!(envelope.error_kind(), Some("EmptyBody"), "{format}");
            }
        }
    }

    #[test]
    fn test_urlencoded_example() {
        let envelope = dispatch(Format::UrlEncoded, None, b"a=1&a=2");
        assert_eq!(envelope.data, Some(json!({"a": ["1", "2"]})));
        let envelope = dispatch(Format::UrlEncoded, None, b"");
        assert_eq!(envelope.data, Some(json!({})));
    }

    #[test]
    fn test_ndjson_partial_and_total_failure() {
        let envelope = dispatch(
            Format::Ndjson,
            Some("application/x-ndjson"),
            b"{\"x\":1}\n{\"x\":2}\nbadline\n",
        );
        assert!(envelope.success);
        assert_eq!(envelope.data, Some(json!([{"x": 1}, {"x": 2}])));
        assert_eq!(envelope.metadata.extra["status"], "partial");
        assert_eq!(envelope.metadata.extra["errors"][0]["line"], 3);

        let envelope = dispatch(Format::Ndjson, None, b"nope\n");
        assert!(!envelope.success);
        assert_eq!(envelope.metadata.extra["status"], "failed");
        assert_eq!(envelope.metadata.extra["errors"][0]["line"], 1);
    }

    #[test]
    fn test_svg_examples() {
        let envelope = dispatch(
            Format::Svg,
            Some("image/svg+xml"),
            b"<svg xmlns=\"http://www.w3.org/2000/svg\"><circle r=\"1\"/></svg>",
        );
        assert!(envelope.success);
        assert_eq!(envelope.data.as_ref().unwrap()["root_confirmed"], true);

        let envelope = dispatch(Format::Svg, Some("image/svg+xml"), b"<rect/>");
        assert!(!envelope.success);
        assert_eq!(envelope.error_kind(), Some("NotAnSVGRoot"));
    }

    #[test]
    fn test_binary_accepts_anything() {
        let envelope = dispatch(Format::Binary, None, b"\x00\xff\x10");
        assert!(envelope.success);
        assert_eq!(envelope.metadata.byte_size, 3);
        assert_eq!(envelope.data, Some(json!({"size": 3, "first_bytes": [0, 255, 16]})));
    }

    #[test]
    fn test_dispatch_is_idempotent() {
        let dispatcher = dispatcher();
        let body = Bytes::from_static(b"<root><a>1</a></root>");
        let first = dispatcher.dispatch(Format::Xml, Some("application/xml"), &body);
        let second = dispatcher.dispatch(Format::Xml, Some("application/xml"), &body);
        assert_eq!(first, second);
    }
}
