//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_forwarded_requests_total` (counter): forwarded requests by method, status
//! - `proxy_forward_duration_seconds` (histogram): time to upstream response headers
//! - `proxy_registry_records` (gauge): records currently in the registry
//! - `proxy_heartbeats_total` (counter): heartbeat calls by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a recorder is installed
//! - The Prometheus exporter runs its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a forwarded request.
pub fn record_forward(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_forwarded_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_forward_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record the current registry size.
pub fn record_registry_size(records: usize) {
    metrics::gauge!("proxy_registry_records").set(records as f64);
}

/// Record one heartbeat call.
pub fn record_heartbeat(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("proxy_heartbeats_total", "outcome" => outcome).increment(1);
}
