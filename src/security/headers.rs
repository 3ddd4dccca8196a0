//! Security response headers.
//!
//! # Responsibilities
//! - Add `x-content-type-options: nosniff` to every response
//!
//! # Design Decisions
//! - Applied as a tower layer, so error responses from middleware get it too
//! - Overrides anything a handler set

use axum::http::{header, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

/// Layer that stops browsers from sniffing echoed bodies as another type.
pub fn nosniff_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    )
}
