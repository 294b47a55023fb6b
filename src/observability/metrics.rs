//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, tunnels, connections)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by method, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_tunnels_opened_total` (counter): established CONNECT tunnels
//! - `proxy_active_connections` (gauge): current connection count

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
///
/// Failure to install is logged, not fatal; the proxy runs fine without
/// an exporter.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            metrics::describe_counter!(
                "proxy_requests_total",
                "Total requests handled, by method and status"
            );
            metrics::describe_histogram!(
                "proxy_request_duration_seconds",
                "Request handling latency in seconds, by method"
            );
            metrics::describe_counter!(
                "proxy_tunnels_opened_total",
                "CONNECT tunnels successfully established"
            );
            metrics::describe_gauge!(
                "proxy_active_connections",
                "Connections currently being served"
            );
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(error) => {
            tracing::error!(%error, "Failed to install metrics exporter");
        }
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!(
        "proxy_request_duration_seconds",
        "method" => method.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one successfully established CONNECT tunnel.
pub fn record_tunnel_opened() {
    metrics::counter!("proxy_tunnels_opened_total").increment(1);
}
