//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};

use registry_proxy::{HttpServer, ProxyConfig, ProxyRegistry, Shutdown};

/// Bind an ephemeral port on loopback.
pub async fn bind() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").await.unwrap()
}

/// Serve `app` on an ephemeral port.
pub async fn start_backend(app: Router) -> SocketAddr {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that echoes what it received as JSON.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(Router::new().fallback(echo)).await
}

/// Start a backend that waits `delay` before sending its response headers.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    start_backend(Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    }))
    .await
}

/// Start a backend that streams `first\n`, then holds the body open until
/// `release` is notified before sending `second\n`.
pub async fn start_streaming_backend(release: Arc<Notify>) -> SocketAddr {
    start_backend(Router::new().fallback(move || {
        let release = release.clone();
        async move {
            let chunks = futures_util::stream::unfold(0u8, move |step| {
                let release = release.clone();
                async move {
                    match step {
                        0 => Some((Ok::<_, std::io::Error>("first\n"), 1)),
                        1 => {
                            release.notified().await;
                            Some((Ok("second\n"), 2))
                        }
                        _ => None,
                    }
                }
            });
            ([("x-backend", "stream")], Body::from_stream(chunks))
        }
    }))
    .await
}

async fn echo(request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let headers: Map<String, Value> = parts
        .headers
        .keys()
        .map(|name| {
            let values: Vec<&str> = parts
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            (name.to_string(), json!(values.join(", ")))
        })
        .collect();

    (
        [("x-backend", "echo")],
        Json(json!({
            "method": parts.method.as_str(),
            "path": parts.uri.path(),
            "query": parts.uri.query(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        })),
    )
        .into_response()
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A proxy running in the background.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub registry: Arc<ProxyRegistry>,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<ProxyConfig>,
}

impl TestProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

/// Run a proxy on an already bound listener.
pub async fn spawn_proxy_on(listener: TcpListener, mut config: ProxyConfig) -> TestProxy {
    config.observability.metrics_enabled = false;
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config);
    let registry = server.registry();
    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestProxy {
        addr,
        registry,
        shutdown,
        updates,
    }
}

/// Run a proxy on an ephemeral port.
pub async fn spawn_proxy(config: ProxyConfig) -> TestProxy {
    spawn_proxy_on(bind().await, config).await
}

/// HTTP client without connection reuse or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
