//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware
//! - Hold shared state (registry, live settings, upstream client)
//! - Apply config reloads to the running server
//! - Run the presence notifier alongside the listener
//!
//! # Middleware Order (outermost first)
//! ```text
//! catch panic → set request id → trace → propagate request id
//!     → concurrency limit → path base strip
//!     → registry endpoint → forwarding → fallback (404 entity)
//! ```

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::StreamExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::admin::registry_endpoint;
use crate::config::{ProxyConfig, TimeoutConfig};
use crate::error::ProxyError;
use crate::http::forward::forward_middleware;
use crate::http::negotiation::negotiate;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{panic_response, EntityResponse};
use crate::presence::ProxyNotifier;
use crate::registry::ProxyRegistry;
use crate::resilience::timeouts;
use crate::routing::segments;

/// Application state injected into middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProxyRegistry>,
    pub settings: Arc<ArcSwap<ProxyConfig>>,
    pub client: Client<HttpConnector, Body>,
    pub in_flight: Arc<Semaphore>,
    /// Name this instance adds to `Via` on forwarded requests.
    pub instance: Arc<str>,
}

impl AppState {
    pub fn new(config: ProxyConfig, registry: Arc<ProxyRegistry>) -> Self {
        let client = build_client(&config.timeouts);
        let in_flight = Arc::new(Semaphore::new(config.listener.max_connections));
        Self {
            registry,
            settings: Arc::new(ArcSwap::from_pointee(config)),
            client,
            in_flight,
            instance: format!("registry-proxy-{}", Uuid::new_v4().simple()).into(),
        }
    }

    /// Swap in a reloaded config and load its static proxies.
    ///
    /// Records added earlier (statically or via the registry endpoint) are
    /// kept; the connect timeout and connection limit keep their startup values.
    pub fn apply_config(&self, config: ProxyConfig) {
        let loaded = self.registry.load_static(&config.proxies);
        tracing::info!(
            static_proxies = loaded,
            records = self.registry.len(),
            "Applied configuration update"
        );
        self.settings.store(Arc::new(config));
    }
}

/// Pooled upstream client with the configured connect timeout.
pub fn build_client(config: &TimeoutConfig) -> Client<HttpConnector, Body> {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(timeouts::connect(config)));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// HTTP server for the registry proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server; static proxies from `config` are registered up front.
    pub fn new(config: ProxyConfig) -> Self {
        let registry = Arc::new(ProxyRegistry::from_config(&config.proxies));
        let state = AppState::new(config, registry);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(fallback_handler)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                forward_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                registry_endpoint,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                path_base_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                limit_middleware,
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
            .layer(CatchPanicLayer::custom(panic_response))
            .with_state(state)
    }

    /// The live registry.
    pub fn registry(&self) -> Arc<ProxyRegistry> {
        self.state.registry.clone()
    }

    /// Shared state, for embedding the router elsewhere.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Config reloads arriving on `config_updates` are applied while running.
    /// The presence notifier runs for the lifetime of the server and is
    /// stopped before this returns.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            records = self.state.registry.len(),
            "HTTP server starting"
        );

        let notifier = ProxyNotifier::new(self.state.settings.clone()).start();

        let updates_state = self.state.clone();
        let updates = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                updates_state.apply_config(config);
            }
        });

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        notifier.stop().await;
        updates.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Bound the number of requests in flight.
///
/// The permit moves into the response body, so a streamed response counts
/// until its last chunk is written or the client goes away.
async fn limit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Ok(permit) = state.in_flight.clone().acquire_owned().await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    next.run(request).await.map(|body| {
        Body::from_stream(body.into_data_stream().map(move |chunk| {
            let _held = &permit;
            chunk
        }))
    })
}

/// Strip the configured path base so inner layers see base-relative paths.
async fn path_base_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let stripped = {
        let settings = state.settings.load();
        let base = settings.listener.path_base.trim_end_matches('/');
        if base.is_empty() {
            None
        } else {
            strip_path_base(request.uri(), base)
        }
    };
    if let Some(uri) = stripped {
        *request.uri_mut() = uri;
    }
    next.run(request).await
}

/// Remove `base` from the front of `uri`'s path, keeping the query.
///
/// Returns `None` when the path is not under `base`.
pub fn strip_path_base(uri: &Uri, base: &str) -> Option<Uri> {
    if !segments::starts_with(uri.path(), base) {
        return None;
    }
    let rest = segments::strip(uri.path(), segments::count(base));
    let path_and_query = match uri.query() {
        Some(query) => format!("/{rest}?{query}"),
        None => format!("/{rest}"),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}

/// Requests no proxy and no registry endpoint claimed.
async fn fallback_handler(request: Request) -> Response {
    let negotiated = negotiate(request.headers(), request.uri().query());
    let error = ProxyError::NoRoute(request.uri().path().to_string());
    tracing::debug!(path = %request.uri().path(), "No route matched");
    EntityResponse::error(&error, negotiated).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use tower::ServiceExt;

    #[test]
    fn strips_path_base_case_insensitively() {
        let uri: Uri = "/Gateway/shop/items?id=3".parse().unwrap();
        let stripped = strip_path_base(&uri, "/gateway").unwrap();
        assert_eq!(stripped.path(), "/shop/items");
        assert_eq!(stripped.query(), Some("id=3"));

        let root: Uri = "/gateway".parse().unwrap();
        assert_eq!(strip_path_base(&root, "/gateway").unwrap().path(), "/");

        let outside: Uri = "/other/shop".parse().unwrap();
        assert!(strip_path_base(&outside, "/gateway").is_none());
    }

    #[tokio::test]
    async fn unmatched_request_gets_negotiated_404() {
        let server = HttpServer::new(ProxyConfig::default());
        let response = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/nothing/here")
                    .header(header::ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn registry_endpoint_honours_path_base() {
        let mut config = ProxyConfig::default();
        config.listener.path_base = "/gw".into();
        let server = HttpServer::new(config);

        let response = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/gw/api/1/proxies?path=/Shop&reverseUri=http://upstream.local/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(server.registry().find_exact("/Shop").is_some());
    }

    #[tokio::test]
    async fn in_flight_permit_lives_as_long_as_the_body() {
        let mut config = ProxyConfig::default();
        config.listener.max_connections = 1;
        let server = HttpServer::new(config);
        let in_flight = server.state().in_flight.clone();

        let response = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/nothing/here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(in_flight.available_permits(), 0);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(!body.is_empty());
        assert_eq!(in_flight.available_permits(), 1);
    }

    #[test]
    fn config_update_keeps_dynamic_records() {
        let server = HttpServer::new(ProxyConfig::default());
        let registry = server.registry();
        registry.add(crate::registry::ProxyRecord::parse("/Dyn", "http://dyn.local/").unwrap());

        let mut config = ProxyConfig::default();
        config.proxies.push(crate::config::StaticProxyConfig {
            path: "/Static".into(),
            reverse_uri: "http://static.local/".into(),
        });
        server.state().apply_config(config);

        assert!(registry.find_exact("/Dyn").is_some());
        assert!(registry.find_exact("/Static").is_some());
        assert_eq!(server.state().settings.load().proxies.len(), 1);
    }
}
