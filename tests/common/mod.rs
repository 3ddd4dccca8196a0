//! Shared utilities for integration tests.

use std::net::SocketAddr;

use post_formats::config::AppConfig;
use post_formats::http::HttpServer;
use post_formats::lifecycle::Shutdown;
use tokio::net::TcpListener;

pub const TOKEN: &str = "testtoken0123456789";

/// A server bound to an ephemeral port. Shuts down on drop.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST with a matching CSRF cookie and header.
    pub fn post(&self, path: &str, content_type: &str, body: impl Into<reqwest::Body>) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("content-type", content_type)
            .header("cookie", format!("csrftoken={TOKEN}"))
            .header("x-csrftoken", TOKEN)
            .body(body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_server(mut config: AppConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".into();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    TestServer {
        addr,
        client,
        shutdown,
    }
}

#[allow(dead_code)]
pub async fn spawn_default() -> TestServer {
    spawn_server(AppConfig::default()).await
}
