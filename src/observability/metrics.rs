//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxyflow_http_requests_total` (counter): requests by method, route, status
//! - `proxyflow_http_request_duration_seconds` (histogram): latency distribution
//! - `proxyflow_allocations_total` (counter): allocation batches committed
//! - `proxyflow_allocated_proxies_total` (counter): allocation rows written
//! - `proxyflow_allocation_failures_total` (counter): rejected calls by reason
//! - `proxyflow_registrations_total` (counter): users registered
//! - `proxyflow_pool_used_slots` / `proxyflow_pool_capacity` (gauges)

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("proxyflow_http_requests_total", &labels).increment(1);
    ::metrics::histogram!("proxyflow_http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_allocation(count: usize) {
    ::metrics::counter!("proxyflow_allocations_total").increment(1);
    ::metrics::counter!("proxyflow_allocated_proxies_total").increment(count as u64);
}

pub fn record_allocation_failure(reason: &'static str) {
    ::metrics::counter!("proxyflow_allocation_failures_total", "reason" => reason).increment(1);
}

pub fn record_registration() {
    ::metrics::counter!("proxyflow_registrations_total").increment(1);
}

pub fn record_pool_usage(used: u64, capacity: u64) {
    ::metrics::gauge!("proxyflow_pool_used_slots").set(used as f64);
    ::metrics::gauge!("proxyflow_pool_capacity").set(capacity as f64);
}
