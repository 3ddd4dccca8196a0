//! `text/html` parser.
//!
//! HTML is treated as opaque markup. A coarse tag scan reports whether start
//! and end tags pair up, but imbalance is never an error.

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;

use super::text::decode_utf8;
use super::{BodyParser, Format, FormatError, ParsedValue};

/// Elements that never take an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Outcome of the tag scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagBalance {
    pub tag_count: usize,
    /// Opened but never closed, in document order of detection.
    pub unclosed: Vec<String>,
    /// End tags with no matching open element.
    pub stray_closing: Vec<String>,
}

impl TagBalance {
    pub fn is_balanced(&self) -> bool {
        self.unclosed.is_empty() && self.stray_closing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlDocument {
    pub html: String,
    pub tags_balanced: bool,
    #[serde(skip)]
    pub balance: TagBalance,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl BodyParser for HtmlParser {
    fn format(&self) -> Format {
        Format::Html
    }

    fn parse(&self, body: &Bytes, _content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        let html = decode_utf8(body)?;
        let balance = scan_tags(&html);
        Ok(ParsedValue::Html(HtmlDocument {
            tags_balanced: balance.is_balanced(),
            balance,
            html,
        }))
    }
}

/// Walk the markup and pair start tags with end tags.
///
/// Comments, doctypes and processing instructions are skipped. Tag names are
/// compared case-insensitively. Closing an outer element implicitly closes
/// (and reports) anything still open inside it. Runs in linear time.
pub fn scan_tags(html: &str) -> TagBalance {
    // ASCII lowercasing keeps every byte offset and char boundary.
    let html = html.to_ascii_lowercase();
    let mut report = TagBalance::default();
    let mut open = OpenElements::default();
    let mut rest = html.as_str();

    while let Some(start) = rest.find('<') {
        rest = &rest[start..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
            continue;
        }

        let closing = rest.starts_with("</");
        let tail = if closing { &rest[2..] } else { &rest[1..] };
        if !tail.starts_with(|c: char| c.is_ascii_alphabetic()) {
            // A bare '<' in text.
            rest = &rest[1..];
            continue;
        }
        let name_len = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
            .unwrap_or(tail.len());
        let name = &tail[..name_len];
        let Some(end) = find_tag_end(tail) else {
            // Unterminated tag at end of input.
            report.unclosed.extend(open.into_names());
            if !closing {
                report.unclosed.push(name.to_owned());
            }
            return report;
        };
        let self_closing = tail[..end].trim_end().ends_with('/');
        rest = &tail[end + 1..];
        report.tag_count += 1;

        if closing {
            match open.close(name) {
                Some(implicitly_closed) => report.unclosed.extend(implicitly_closed),
                None => report.stray_closing.push(name.to_owned()),
            }
        } else if self_closing || VOID_ELEMENTS.contains(&name) {
            continue;
        } else if RAW_TEXT_ELEMENTS.contains(&name) {
            let closer = format!("</{name}");
            match rest.find(&closer) {
                Some(offset) => {
                    rest = &rest[offset..];
                    open.push(name);
                }
                None => {
                    report.unclosed.push(name.to_owned());
                    rest = "";
                }
            }
        } else {
            open.push(name);
        }
    }

    report.unclosed.extend(open.into_names());
    report
}

/// Stack of open elements with a per-name count, so an end tag with no
/// matching start is detected without walking the stack.
#[derive(Debug, Default)]
struct OpenElements {
    stack: Vec<String>,
    counts: HashMap<String, usize>,
}

impl OpenElements {
    fn push(&mut self, name: &str) {
        *self.counts.entry(name.to_owned()).or_default() += 1;
        self.stack.push(name.to_owned());
    }

    /// Close the innermost `name`. Returns the elements closed implicitly on
    /// the way, or `None` when `name` is not open.
    fn close(&mut self, name: &str) -> Option<Vec<String>> {
        if self.counts.get(name).copied().unwrap_or(0) == 0 {
            return None;
        }
        let position = self.stack.iter().rposition(|n| n == name)?;
        let inner: Vec<String> = self.stack.drain(position..).collect();
        for closed in &inner {
            if let Some(count) = self.counts.get_mut(closed) {
                *count -= 1;
            }
        }
        Some(inner[1..].to_vec())
    }

    fn into_names(self) -> Vec<String> {
        self.stack
    }
}

/// Index of the `>` ending a tag, skipping quoted attribute values.
fn find_tag_end(tag: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, c) in tag.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(index),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_balanced_document() {
        let report = scan_tags(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>t</title></head>\
             <body><p class='a>b'>hi<br></p><img src=x /></body></html>",
        );
        assert!(report.is_balanced(), "{report:?}");
        assert_eq!(report.tag_count, 13);
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let report = scan_tags("<div><p>one<p>two</div></span>");
        assert_eq!(report.unclosed, vec!["p", "p"]);
        assert_eq!(report.stray_closing, vec!["span"]);
        assert!(!report.is_balanced());
    }

    #[test]
    fn test_case_insensitive_names() {
        assert!(scan_tags("<DIV>x</div>").is_balanced());
    }

    #[test]
    fn test_script_content_is_not_markup() {
        let report = scan_tags("<script>if (a < b) { x = '</p>'; }</SCRIPT><p>ok</p>");
        assert!(report.is_balanced(), "{report:?}");
    }

    #[test]
    fn test_comments_and_bare_angle_brackets() {
        let report = scan_tags("<!-- <div> --> 1 < 2 <b>bold</b>");
        assert!(report.is_balanced());
        assert_eq!(report.tag_count, 2);
    }

    #[test]
    fn test_unterminated_tag() {
        let report = scan_tags("<div><span");
        assert_eq!(report.unclosed, vec!["div", "span"]);
    }

    #[test]
    fn test_implicitly_closed_elements_are_reported_once() {
        let report = scan_tags("<div><span><b>x</div><span></span>");
        assert_eq!(report.unclosed, vec!["span", "b"]);
        assert!(report.stray_closing.is_empty());
    }

    #[test]
    fn test_large_inputs_scan_in_linear_time() {
        let count = 200_000;
        let started = Instant::now();

        let titles = "<TITLE></title>".repeat(count);
        let report = scan_tags(&titles);
        assert!(report.is_balanced());
        assert_eq!(report.tag_count, 2 * count);

        let strays = "<div>".repeat(count) + &"</span>".repeat(count);
        let report = scan_tags(&strays);
        assert_eq!(report.unclosed.len(), count);
        assert_eq!(report.stray_closing.len(), count);

        let nested = "<p>".repeat(count) + &"</p>".repeat(count);
        assert!(scan_tags(&nested).is_balanced());

        // Quadratic scanning of these inputs takes minutes.
        assert!(started.elapsed() < Duration::from_secs(10), "{:?}", started.elapsed());
    }

    #[test]
    fn test_parser_never_fails_on_imbalance() {
        let parsed = HtmlParser
            .parse(&Bytes::from_static(b"<div><p>unclosed"), Some("text/html"))
            .unwrap();
        match parsed {
            ParsedValue::Html(doc) => {
                assert!(!doc.tags_balanced);
                assert_eq!(doc.html, "<div><p>unclosed");
            }
            other => panic!("expected html, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_is_valid() {
        let parsed = HtmlParser.parse(&Bytes::new(), None).unwrap();
        assert!(matches!(parsed, ParsedValue::Html(doc) if doc.tags_balanced && doc.html.is_empty()));
    }
}
