//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits consistent)
//! - Check addresses and header names before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate the whole configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let limits = &config.limits;
    if limits.max_body_size == 0 {
        errors.push(ValidationError::new("limits.max_body_size", "must be greater than 0"));
    }
    if limits.multipart_max_field_size > limits.max_body_size as u64 {
        errors.push(ValidationError::new(
            "limits.multipart_max_field_size",
            format!("must not exceed max_body_size ({})", limits.max_body_size),
        ));
    }
    if limits.xml_max_depth == 0 {
        errors.push(ValidationError::new("limits.xml_max_depth", "must be greater than 0"));
    }

    check_header_name(&mut errors, "csrf.cookie_name", &config.csrf.cookie_name);
    check_header_name(&mut errors, "csrf.header_name", &config.csrf.header_name);

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}, expected one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }
    check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(field, format!("invalid socket address {value:?}: {e}")));
    }
}

// Cookie names share the header-name token grammar.
fn check_header_name(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
    } else if HeaderName::from_bytes(value.as_bytes()).is_err() {
        errors.push(ValidationError::new(field, format!("{value:?} is not a valid token")));
    }
}
