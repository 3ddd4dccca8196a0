//! CSRF protection via double-submit cookie.
//!
//! # Responsibilities
//! - Verify that unsafe requests echo the CSRF cookie in a header
//! - Issue fresh tokens for clients that have none
//! - Reject failures with 403 before any body is parsed
//!
//! # Design Decisions
//! - Verification is a capability (`CsrfVerifier`) held in router state, so
//!   the HTTP layer never knows which scheme is active
//! - Tokens are compared in constant time
//! - Safe methods (GET, HEAD, OPTIONS, TRACE) are never checked

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use cookie::{Cookie, SameSite};
use serde_json::json;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::config::CsrfConfig;
use crate::observability::metrics;

/// Why a request failed CSRF verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CsrfRejection {
    #[error("CSRF cookie not set")]
    MissingCookie,

    #[error("CSRF token missing")]
    MissingToken,

    #[error("CSRF token incorrect")]
    TokenMismatch,
}

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": format!("CSRFFailed: {self}"),
        });
        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}

/// Decides whether a request carries a valid CSRF credential.
pub trait CsrfVerifier: Send + Sync + fmt::Debug {
    fn verify(&self, method: &Method, headers: &HeaderMap) -> Result<(), CsrfRejection>;

    /// Name of the cookie holding the token, if this verifier uses one.
    fn cookie_name(&self) -> Option<&str>;
}

/// Build the verifier described by config.
pub fn verifier_from_config(config: &CsrfConfig) -> Arc<dyn CsrfVerifier> {
    if !config.enabled {
        tracing::warn!("CSRF protection disabled");
        return Arc::new(NoCsrf);
    }
    match HeaderName::from_bytes(config.header_name.as_bytes()) {
        Ok(header_name) => Arc::new(DoubleSubmitCookie::new(config.cookie_name.clone(), header_name)),
        // Validation rejects this earlier; fall back to the default header.
        Err(_) => Arc::new(DoubleSubmitCookie::new(
            config.cookie_name.clone(),
            HeaderName::from_static("x-csrftoken"),
        )),
    }
}

/// The cookie value must be repeated verbatim in a request header.
#[derive(Debug, Clone)]
pub struct DoubleSubmitCookie {
    cookie_name: String,
    header_name: HeaderName,
}

impl DoubleSubmitCookie {
    pub fn new(cookie_name: impl Into<String>, header_name: HeaderName) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            header_name,
        }
    }
}

impl CsrfVerifier for DoubleSubmitCookie {
    fn verify(&self, method: &Method, headers: &HeaderMap) -> Result<(), CsrfRejection> {
        if is_safe_method(method) {
            return Ok(());
        }
        let cookie = read_cookie(headers, &self.cookie_name).ok_or(CsrfRejection::MissingCookie)?;
        let token = headers
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(CsrfRejection::MissingToken)?;

        if tokens_match(&cookie, token) {
            Ok(())
        } else {
            Err(CsrfRejection::TokenMismatch)
        }
    }

    fn cookie_name(&self) -> Option<&str> {
        Some(&self.cookie_name)
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCsrf;

impl CsrfVerifier for NoCsrf {
    fn verify(&self, _method: &Method, _headers: &HeaderMap) -> Result<(), CsrfRejection> {
        Ok(())
    }

    fn cookie_name(&self) -> Option<&str> {
        None
    }
}

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// Find a non-empty cookie by name across every `Cookie` header.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

pub fn issue_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `Set-Cookie` value carrying `token`. Readable from scripts so that
/// pages can copy it into the header.
pub fn token_cookie(name: &str, token: &str) -> Option<HeaderValue> {
    let cookie = Cookie::build((name.to_owned(), token.to_owned()))
        .path("/")
        .same_site(SameSite::Lax)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

fn tokens_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Rejects requests that fail verification before they reach a handler.
pub async fn csrf_middleware(
    State(verifier): State<Arc<dyn CsrfVerifier>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match verifier.verify(request.method(), request.headers()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = %rejection,
                "CSRF verification failed"
            );
            metrics::record_csrf_rejection();
            rejection.into_response()
        }
    }
}
