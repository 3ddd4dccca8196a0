//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with one POST route per format plus the index
//! - Wire up middleware (CSRF, body limit, request ID, tracing, timeout)
//! - Turn timeouts into JSON failures like every other error
//! - Bind server to listener and stop on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderMap, Method},
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::formats::{Dispatcher, Format};
use crate::http::handlers;
use crate::http::response::timeout_envelope;
use crate::security::csrf::{csrf_middleware, verifier_from_config, CsrfVerifier};
use crate::security::headers::nosniff_layer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub csrf: Arc<dyn CsrfVerifier>,
    pub max_body_size: usize,
}

/// HTTP server for the format endpoints.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(&config.limits)),
            csrf: verifier_from_config(&config.csrf),
            max_body_size: config.limits.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let mut router = Router::new().route("/", get(handlers::index));
        for format in Format::ALL {
            router = router.route(format.route(), format_route(format));
        }

        let router = router
            .layer(middleware::from_fn_with_state(state.csrf.clone(), csrf_middleware))
            .layer(DefaultBodyLimit::max(config.limits.max_body_size))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::map_response_with_state(
                        config.timeouts.request_secs,
                        timeout_envelope,
                    ))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            );

        if config.security.enable_headers {
            router.layer(nosniff_layer())
        } else {
            router
        }
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            csrf_enabled = self.config.csrf.enabled,
            max_body_size = self.config.limits.max_body_size,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// POST parses under `format`; every other method gets a 405 envelope.
fn format_route(format: Format) -> MethodRouter<AppState> {
    post(move |State(state): State<AppState>, headers: HeaderMap, body: Result<Bytes, BytesRejection>| async move {
        handlers::parse_body(state, format, headers, body).await
    })
    .fallback(move |method: Method, headers: HeaderMap| async move {
        handlers::method_not_allowed(format, method, headers).await
    })
}
