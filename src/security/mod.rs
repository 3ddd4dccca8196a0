//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → csrf.rs (double-submit cookie check on unsafe methods)
//!     → Pass to handlers
//!
//! Outgoing response:
//!     → headers.rs (nosniff)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any CSRF check failure
//! - No trust in client input

pub mod csrf;
pub mod headers;

pub use csrf::{csrf_middleware, verifier_from_config, CsrfRejection, CsrfVerifier, DoubleSubmitCookie, NoCsrf};
