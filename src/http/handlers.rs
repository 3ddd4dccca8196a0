//! Request handlers.
//!
//! # Responsibilities
//! - Hand buffered bodies to the dispatcher and wrap the envelope
//! - Answer non-POST methods on format routes with 405
//! - Serve the index page and issue the CSRF cookie
//!
//! # Data Flow
//! ```text
//! POST /api/<format>/
//!     → body buffered (413 if over the limit)
//!     → dispatcher (parse, flag mismatch)
//!     → metrics + log
//!     → ApiResponse (200 / 400)
//! ```

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, Method},
    response::{Html, IntoResponse, Response},
};
use bytes::Bytes;

use crate::formats::Format;
use crate::http::request;
use crate::http::response::ApiResponse;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::csrf::{issue_token, read_cookie, token_cookie};

/// Parse a POST body under the route's format.
pub async fn parse_body(
    state: AppState,
    format: Format,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResponse {
    let request_id = request::request_id(&headers);
    let content_type = request::content_type(&headers);

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(
                request_id = %request_id,
                format = %format,
                status = %rejection.status(),
                error = %rejection.body_text(),
                "Failed to read request body"
            );
            metrics::record_parse(format, "failure", 0);
            return ApiResponse::body_rejected(format, &rejection, content_type, state.max_body_size);
        }
    };

    let envelope = state.dispatcher.dispatch(format, content_type, &body);
    metrics::record_parse(format, envelope.outcome(), body.len());

    if envelope.success {
        tracing::debug!(
            request_id = %request_id,
            format = %format,
            byte_size = body.len(),
            content_type_mismatch = envelope.metadata.content_type_mismatch,
            outcome = envelope.outcome(),
            "Parsed request body"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            format = %format,
            byte_size = body.len(),
            content_type_mismatch = envelope.metadata.content_type_mismatch,
            error_kind = envelope.error_kind().unwrap_or("unknown"),
            "Rejected request body"
        );
    }

    ApiResponse::from_envelope(envelope)
}

pub async fn method_not_allowed(format: Format, method: Method, headers: HeaderMap) -> ApiResponse {
    tracing::debug!(
        request_id = %request::request_id(&headers),
        format = %format,
        method = %method,
        "Method not allowed"
    );
    ApiResponse::method_not_allowed(format, &method, request::content_type(&headers))
}

/// Index page. Issues a CSRF cookie to clients that have none.
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut response = Html(index_page()).into_response();

    let Some(cookie_name) = state.csrf.cookie_name() else {
        return response;
    };
    if read_cookie(&headers, cookie_name).is_some() {
        return response;
    }
    if let Some(value) = token_cookie(cookie_name, &issue_token()) {
        response.headers_mut().append(header::SET_COOKIE, value);
        tracing::debug!(cookie = cookie_name, "Issued CSRF cookie");
    }
    response
}

fn index_page() -> String {
    let items: String = Format::ALL
        .iter()
        .map(|format| {
            format!(
                "<li><code>POST {}</code> ({})</li>\n",
                format.route(),
                format.expected_content_type()
            )
        })
        .collect();
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>POST formats</title></head>\n<body>\n\
         <h1>POST formats</h1>\n<p>Each endpoint echoes the parsed body in a JSON envelope.</p>\n\
         <ul>\n{items}</ul>\n</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_lists_every_route() {
        let page = index_page();
        for format in Format::ALL {
            assert!(page.contains(format.route()), "{format}");
        }
    }
}
