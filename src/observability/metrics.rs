//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define parse metrics (per-format outcomes, body sizes)
//! - Count CSRF rejections
//! - Expose a Prometheus-compatible metrics endpoint when enabled
//!
//! # Metrics
//! - `post_formats_requests_total` (counter): parse attempts by format, outcome
//! - `post_formats_body_bytes` (histogram): body size by format
//! - `post_formats_csrf_rejections_total` (counter): requests refused with 403
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so handlers never check a flag

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::formats::Format;

pub const REQUESTS_TOTAL: &str = "post_formats_requests_total";
pub const BODY_BYTES: &str = "post_formats_body_bytes";
pub const CSRF_REJECTIONS_TOTAL: &str = "post_formats_csrf_rejections_total";

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Parse attempts by format and outcome");
    describe_histogram!(BODY_BYTES, "Request body size in bytes");
    describe_counter!(CSRF_REJECTIONS_TOTAL, "Requests rejected by CSRF verification");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one parse attempt.
pub fn record_parse(format: Format, outcome: &'static str, byte_size: usize) {
    counter!(REQUESTS_TOTAL, "format" => format.tag(), "outcome" => outcome).increment(1);
    histogram!(BODY_BYTES, "format" => format.tag()).record(byte_size as f64);
}

pub fn record_csrf_rejection() {
    counter!(CSRF_REJECTIONS_TOTAL).increment(1);
}
