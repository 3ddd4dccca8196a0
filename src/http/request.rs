//! Request header helpers.
//!
//! # Responsibilities
//! - Name the request ID header shared by the set/propagate layers
//! - Read the declared Content-Type and request ID for handlers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Headers that are not valid visible ASCII are treated as absent

use axum::http::{header, HeaderMap, HeaderName};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Declared `Content-Type`, verbatim.
pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_reads_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_type(&headers), None);
        assert_eq!(request_id(&headers), "unknown");

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));
        assert_eq!(content_type(&headers), Some("text/plain; charset=utf-8"));
        assert_eq!(request_id(&headers), "abc");
    }

    #[test]
    fn test_opaque_content_type_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_bytes(b"text/\xffplain").unwrap());
        assert_eq!(content_type(&headers), None);
    }
}
