//! Parsed body representation.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::binary::BinaryData;
use super::html::HtmlDocument;
use super::multipart::MultipartData;
use super::ndjson::NdjsonBatch;
use super::svg::SvgDocument;
use super::text::TextData;
use super::xml::XmlDocument;
use super::Format;

/// Result of a successful parse, one variant per format.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Json(Value),
    Multipart(MultipartData),
    /// Keys in first-seen order; repeated keys accumulate values.
    UrlEncoded(IndexMap<String, Vec<String>>),
    Text(TextData),
    Binary(BinaryData),
    Xml(XmlDocument),
    Html(HtmlDocument),
    Svg(SvgDocument),
    Ndjson(NdjsonBatch),
}

impl ParsedValue {
    pub fn format(&self) -> Format {
        match self {
            ParsedValue::Json(_) => Format::Json,
            ParsedValue::Multipart(_) => Format::Multipart,
            ParsedValue::UrlEncoded(_) => Format::UrlEncoded,
            ParsedValue::Text(_) => Format::Text,
            ParsedValue::Binary(_) => Format::Binary,
            ParsedValue::Xml(_) => Format::Xml,
            ParsedValue::Html(_) => Format::Html,
            ParsedValue::Svg(_) => Format::Svg,
            ParsedValue::Ndjson(_) => Format::Ndjson,
        }
    }

    /// Envelope `data` projection.
    pub fn data(&self) -> Value {
        match self {
            ParsedValue::Json(value) => value.clone(),
            ParsedValue::Multipart(form) => json!(form),
            ParsedValue::UrlEncoded(map) => json!(map),
            ParsedValue::Text(text) => Value::String(text.text.clone()),
            ParsedValue::Binary(binary) => json!(binary),
            ParsedValue::Xml(doc) => json!(doc),
            ParsedValue::Html(doc) => json!(doc),
            ParsedValue::Svg(doc) => json!(doc),
            ParsedValue::Ndjson(batch) => Value::Array(batch.values.clone()),
        }
    }

    /// Format-specific metadata extras.
    pub fn metadata(&self) -> Map<String, Value> {
        let extras = match self {
            ParsedValue::Json(value) => json_shape(value),
            ParsedValue::Multipart(form) => json!({
                "field_count": form.fields.len(),
                "file_count": form.files.len(),
                "files": form.files.iter().map(|file| json!({
                    "field": file.field,
                    "filename": file.filename,
                    "size": file.size,
                })).collect::<Vec<_>>(),
            }),
            ParsedValue::UrlEncoded(map) => json!({
                "key_count": map.len(),
                "value_count": map.values().map(Vec::len).sum::<usize>(),
            }),
            ParsedValue::Text(text) => json!({
                "length": text.text.chars().count(),
                "line_count": text.text.lines().count(),
                "charset": text.charset.name(),
            }),
            ParsedValue::Binary(binary) => json!({
                "preview_length": binary.first_bytes.len(),
            }),
            ParsedValue::Xml(doc) => json!({
                "root_tag": doc.root_tag,
                "element_count": doc.stats.element_count,
                "attribute_count": doc.stats.attribute_count,
                "max_depth": doc.stats.max_depth,
            }),
            ParsedValue::Html(doc) => json!({
                "length": doc.html.chars().count(),
                "tag_count": doc.balance.tag_count,
                "tags_balanced": doc.tags_balanced,
                "unclosed_tags": doc.balance.unclosed,
                "stray_closing_tags": doc.balance.stray_closing,
            }),
            ParsedValue::Svg(doc) => json!({
                "length": doc.svg.chars().count(),
                "root_tag": doc.root_tag,
                "element_count": doc.element_count,
            }),
            ParsedValue::Ndjson(batch) => json!({
                "status": batch.status(),
                "lines_count": batch.lines_count,
                "valid_count": batch.values.len(),
                "error_count": batch.errors.len(),
                "errors": batch.errors,
            }),
        };
        match extras {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

fn json_shape(value: &Value) -> Value {
    match value {
        Value::Object(map) => json!({ "value_type": "object", "top_level_keys": map.len() }),
        Value::Array(items) => json!({ "value_type": "array", "item_count": items.len() }),
        Value::String(_) => json!({ "value_type": "string" }),
        Value::Number(_) => json!({ "value_type": "number" }),
        Value::Bool(_) => json!({ "value_type": "boolean" }),
        Value::Null => json!({ "value_type": "null" }),
    }
}
