//! Envelope → HTTP response mapping.
//!
//! # Responsibilities
//! - Pick the status code for an envelope (200, 400, 405, 413)
//! - Add the `Allow` header to 405 responses
//! - Give timed-out requests a JSON body
//!
//! # Design Decisions
//! - Every response from a format route is a JSON envelope, errors included
//! - Status follows `success`; the envelope body carries the detail

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::formats::dispatcher::content_type_matches;
use crate::formats::{Envelope, Format, Metadata};

/// An envelope with the status it is sent under.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl ApiResponse {
    /// 200 on success, 400 otherwise.
    pub fn from_envelope(envelope: Envelope) -> Self {
        let status = if envelope.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        Self { status, envelope }
    }

    pub fn method_not_allowed(format: Format, method: &Method, content_type: Option<&str>) -> Self {
        let envelope = Envelope::failure(
            format,
            format!("MethodNotAllowed: {method} is not allowed on {}, use POST", format.route()),
            empty_metadata(format, content_type),
        );
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            envelope,
        }
    }

    /// The body could not be buffered: too large, or the connection failed.
    pub fn body_rejected(format: Format, rejection: &BytesRejection, content_type: Option<&str>, limit: usize) -> Self {
        let status = rejection.status();
        let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
            format!("PayloadTooLarge: request body exceeds {limit} bytes")
        } else {
            format!("BadRequest: {}", rejection.body_text())
        };
        Self {
            status,
            envelope: Envelope::failure(format, error, empty_metadata(format, content_type)),
        }
    }
}

fn empty_metadata(format: Format, content_type: Option<&str>) -> Metadata {
    Metadata::new(format, 0, content_type, !content_type_matches(format, content_type))
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.envelope)).into_response();
        if self.status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Replace the empty 408 produced by the timeout layer with a JSON body.
///
/// The route is unknown at this point, so the body has no `format` field.
pub async fn timeout_envelope(State(timeout_secs): State<u64>, response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT || response.headers().contains_key(header::CONTENT_TYPE) {
        return response;
    }
    tracing::warn!(timeout_secs, "Request timed out");
    let body = json!({
        "success": false,
        "error": format!("RequestTimeout: request did not complete within {timeout_secs}s"),
    });
    (StatusCode::REQUEST_TIMEOUT, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ParsedValue;
    use axum::body::{to_bytes, Body};
    use serde_json::{json, Value};

    #[test]
    fn test_status_follows_success() {
        let ok = Envelope::parsed(
            &ParsedValue::Json(json!(1)),
            Metadata::new(Format::Json, 1, Some("application/json"), false),
        );
        assert_eq!(ApiResponse::from_envelope(ok).status, StatusCode::OK);

        let failed = Envelope::failure(Format::Json, "ParseError: x".into(), Metadata::new(Format::Json, 1, None, true));
        assert_eq!(ApiResponse::from_envelope(failed).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let api = ApiResponse::method_not_allowed(Format::Xml, &Method::GET, None);
        assert_eq!(api.envelope.error_kind(), Some("MethodNotAllowed"));
        assert_eq!(api.envelope.format, Format::Xml);

        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_timeout_gets_json_body() {
        let timed_out = axum::http::Response::builder()
            .status(StatusCode::REQUEST_TIMEOUT)
            .body(Body::empty())
            .unwrap();
        let response = timeout_envelope(State(5), timed_out).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({"success": false, "error": "RequestTimeout: request did not complete within 5s"})
        );
    }

    #[tokio::test]
    async fn test_other_responses_pass_through() {
        let api = ApiResponse::method_not_allowed(Format::Json, &Method::PUT, None);
        let response = timeout_envelope(State(5), api.into_response()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
    }
}
