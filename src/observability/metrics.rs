//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_rpc_requests_total` (counter): JSON-RPC requests by method, outcome
//! - `relay_broadcasts_total` (counter): broadcast calls by outcome
//! - `relay_send_attempts_total` (counter): individual wallet sends by outcome

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and start its scrape endpoint.
///
/// Failure to bind is logged, not fatal; the relay works without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

/// Count one JSON-RPC request.
pub fn record_rpc_request(method: &str, outcome: &'static str) {
    metrics::counter!(
        "relay_rpc_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Count one broadcast call resolution.
pub fn record_broadcast_outcome(outcome: &'static str) {
    metrics::counter!("relay_broadcasts_total", "outcome" => outcome).increment(1);
}

/// Count one individual wallet send.
pub fn record_send_attempt(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!("relay_send_attempts_total", "outcome" => outcome).increment(1);
}
