//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by rule, status
//! - `proxy_request_duration_seconds` (histogram): latency by rule
//! - `proxy_cache_instances` (gauge): constructed proxy instances
//! - `livereload_subscribers` (gauge): open live-reload streams
//! - `livereload_broadcasts_total` (counter): coalesced change messages
//! - `livereload_dropped_total` (counter): per-subscriber messages skipped
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(rule_id: &str, status: u16, start: Instant) {
    let rule = rule_id.to_string();
    counter!("proxy_requests_total", "rule" => rule.clone(), "status" => status.to_string())
        .increment(1);
    histogram!("proxy_request_duration_seconds", "rule" => rule)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_size(size: usize) {
    gauge!("proxy_cache_instances").set(size as f64);
}

pub fn record_subscribers(count: usize) {
    gauge!("livereload_subscribers").set(count as f64);
}

pub fn record_broadcast(delivered: usize, skipped: usize) {
    counter!("livereload_broadcasts_total").increment(1);
    if skipped > 0 {
        counter!("livereload_dropped_total").increment(skipped as u64);
    }
    tracing::trace!(delivered, skipped, "Broadcast recorded");
}
