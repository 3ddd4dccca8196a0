//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request ID + trace + timeout layers
//!     → CSRF middleware (403 on failure)
//!     → handlers.rs (buffer body, dispatch, log, count)
//!     → response.rs (envelope → status + JSON)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiResponse;
pub use server::{AppState, HttpServer};
