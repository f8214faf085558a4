//! Transparent forwarding of registered path prefixes.
//!
//! # Request Flow
//! ```text
//! path → registry.find_by_prefix
//!     miss → next handler
//!     hit  → hop count for this instance         (508 past the limit)
//!          → dot segment + prefix re-check       (502 on mismatch)
//!          → resolve target URI                  (502 on failure)
//!          → split headers, stream body upstream
//!          → await response headers (timeout)    (502 on transport failure)
//!          → relay status, headers, body stream
//! ```
//!
//! # Design Decisions
//! - Bodies are never buffered in either direction
//! - Dropping the handler future (client gone) drops the upstream call and body
//! - Each hop appends `Via: 1.1 <instance>`; a request that already carries
//!   [`MAX_SELF_HOPS`] of this instance's entries is refused, which bounds
//!   cycles such as `/Loop` → `/Loop/` while allowing a few self-relative hops

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::http::headers::{self, OutboundHeaders};
use crate::http::negotiation::negotiate;
use crate::http::request::{origin, request_id};
use crate::http::response::EntityResponse;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::registry::ProxyRecord;
use crate::resilience::timeouts;
use crate::routing::segments;

/// How many times one request may pass through the same instance.
pub const MAX_SELF_HOPS: usize = 8;

/// Middleware forwarding requests under a registered prefix; everything else
/// falls through to `next`.
pub async fn forward_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(record) = state.registry.find_by_prefix(request.uri().path()) else {
        return next.run(request).await;
    };

    let start = Instant::now();
    let negotiated = negotiate(request.headers(), request.uri().query());
    let method = request.method().clone();
    let request_id = request_id(request.headers()).to_string();
    let path = request.uri().path().to_string();

    if !record.is_available() {
        tracing::debug!(
            request_id = %request_id,
            proxy = %record.path(),
            last_seen = %record.last_seen(),
            "Forwarding to a stale or disabled proxy"
        );
    }

    match forward(&state, &record, request).await {
        Ok(response) => {
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                path = %path,
                proxy = %record.path(),
                status = %response.status(),
                "Forwarded request"
            );
            metrics::record_forward(method.as_str(), response.status().as_u16(), start);
            response
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                proxy = %record.path(),
                error = %e,
                "Forwarding failed"
            );
            let response = EntityResponse::error(&e, negotiated).into_response();
            metrics::record_forward(method.as_str(), response.status().as_u16(), start);
            response
        }
    }
}

async fn forward(
    state: &AppState,
    record: &ProxyRecord,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();

    let hops = headers::via_hops(&parts.headers, &state.instance);
    if hops >= MAX_SELF_HOPS {
        return Err(ProxyError::LoopDetected {
            path: path.to_string(),
            hops,
        });
    }

    // Dot segments would be collapsed by the URL join and leave the prefix.
    if segments::has_dot_segment(path) || !segments::starts_with(path, record.path()) {
        return Err(ProxyError::PrefixMismatch {
            path: path.to_string(),
            proxy: record.path().to_string(),
        });
    }

    let remainder = segments::strip(path, segments::count(record.path()));
    let target = record
        .reverse_target()
        .resolve(origin(&parts.headers).as_ref(), remainder, parts.uri.query())
        .map_err(|e| ProxyError::InvalidTargetUri {
            target: record.reverse_target().to_string(),
            reason: e.to_string(),
        })?;

    let settings = state.settings.load_full();
    let with_body = headers::carries_body(&parts.method);
    let excluded = headers::parse_exclusions(&settings.forwarding.excluded_headers);
    let outbound_headers = OutboundHeaders::split(&parts.headers, &excluded);

    let mut builder = axum::http::Request::builder()
        .method(parts.method.clone())
        .uri(target.as_str());
    if let Some(headers) = builder.headers_mut() {
        outbound_headers.apply(headers, with_body);
        headers::append_via(headers, &parts.headers, &state.instance);
    }
    let outbound = builder.body(if with_body { body } else { Body::empty() })?;

    tracing::debug!(
        method = %parts.method,
        target = %target,
        "Issuing upstream request"
    );

    let limit = timeouts::upstream(&settings.timeouts);
    let response = timeouts::within(limit, state.client.request(outbound))
        .await
        .map_err(|_| ProxyError::UpstreamTimeout(limit))??;

    let (mut response_parts, response_body) = response.into_parts();
    headers::strip_response_headers(&mut response_parts.headers);
    Ok(Response::from_parts(response_parts, Body::new(response_body)))
}
