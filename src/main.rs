//! POST format echo server (v0.1)
//!
//! Demonstrates how a server tells request body encodings apart.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client POST /api/<format>/
//!          │
//!          ▼
//!     ┌──────────────┐   ┌──────────┐   ┌──────────────┐   ┌────────────┐
//!     │ http server  │──▶│   CSRF   │──▶│  dispatcher  │──▶│  <format>  │
//!     │ + middleware │   │  check   │   │ (route→fmt)  │   │   parser   │
//!     └──────────────┘   └──────────┘   └──────────────┘   └─────┬──────┘
//!          ▲                                                      │
//!          └────────────────── JSON envelope ◀────────────────────┘
//!
//!     Cross-cutting: config · logging · metrics · lifecycle
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use post_formats::config::{self, AppConfig, ConfigError};
use post_formats::http::HttpServer;
use post_formats::lifecycle::{spawn_signal_handler, Shutdown};
use post_formats::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "post-formats", version, about = "Echo POST bodies in nine encodings")]
struct Cli {
    /// Path to a TOML config file. Defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        config::validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("post-formats v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_size = config.limits.max_body_size,
        config_file = ?cli.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
