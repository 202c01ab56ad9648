//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, cache outcome
//! - `proxy_request_duration_seconds` (histogram): time to response headers
//! - `proxy_cache_entries` (gauge): number of cached bodies
//! - `proxy_cache_events_total` (counter): capture outcomes
//! - `proxy_cache_flushes_total` (counter): snapshot writes by result
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing when the exporter is off.

use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, cache: &'static str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("cache", cache),
    ];
    counter!("proxy_requests_total", labels.clone()).increment(1);
    histogram!("proxy_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

/// Update the cache size gauge.
pub fn record_cache_size(entries: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
}

/// Record a capture outcome (`stored`, `empty`, `not_gzip`, `aborted`, ...).
pub fn record_cache_event(event: &'static str) {
    counter!("proxy_cache_events_total", "event" => event).increment(1);
}

/// Record a snapshot flush by result (`ok` or `error`).
pub fn record_cache_flush(result: &'static str) {
    counter!("proxy_cache_flushes_total", "result" => result).increment(1);
}
