//! POST format echo server library.
//!
//! Accepts request bodies in nine encodings, parses each under its route's
//! format and answers with a uniform JSON envelope.

pub mod config;
pub mod formats;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::AppConfig;
pub use formats::{Dispatcher, Envelope, Format, FormatError, ParsedValue};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
