//! Registry endpoint.
//!
//! # Data Flow
//! ```text
//! request path == admin path (case-insensitive)?
//!     no  → next middleware
//!     yes → handlers.rs (method + query → registry operation)
//!         → negotiated entity response (200 / 400 / 404 / 405)
//! ```
//!
//! # Design Decisions
//! - Mounted as middleware ahead of forwarding, so a proxy registered at
//!   the admin path can never shadow the endpoint
//! - No authentication: peers announce themselves with plain GETs

pub mod handlers;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::negotiation::negotiate;
use crate::http::request::{request_id, QueryParams};
use crate::http::response::EntityResponse;
use crate::http::server::AppState;
use crate::routing::segments;

use self::handlers::Links;

/// Returns true when `path` addresses the registry endpoint itself.
pub fn is_admin_path(path: &str, admin_path: &str) -> bool {
    segments::count(path) == segments::count(admin_path)
        && segments::split(path)
            .zip(segments::split(admin_path))
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// Middleware serving the registry endpoint; other paths fall through.
pub async fn registry_endpoint(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let settings = state.settings.load_full();
    if !is_admin_path(request.uri().path(), &settings.registry.admin_path) {
        return next.run(request).await;
    }

    let negotiated = negotiate(request.headers(), request.uri().query());
    let params = QueryParams::parse(request.uri().query());
    let links = Links::new(request.headers(), &settings);
    let method = request.method();

    match handlers::handle(&state.registry, method, &params, &links) {
        Ok(entity) => {
            tracing::debug!(
                request_id = %request_id(request.headers()),
                method = %method,
                query = request.uri().query().unwrap_or(""),
                "Registry request served"
            );
            EntityResponse::ok(entity, negotiated).into_response()
        }
        Err(e) => {
            tracing::info!(
                request_id = %request_id(request.headers()),
                method = %method,
                query = request.uri().query().unwrap_or(""),
                error = %e,
                "Registry request rejected"
            );
            EntityResponse::error(&e, negotiated).into_response()
        }
    }
}
