//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, bus calls)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_bus_calls_total` (counter): bus calls by interface, member, outcome
//! - `gateway_bus_call_duration_seconds` (histogram): bus call latency
//! - `gateway_bus_calls_in_flight` (gauge): calls issued but not yet completed
//! - `gateway_reconcile_actions_total` (counter): list reconciliation actions by kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished HTTP request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// A bus call left the gateway.
pub fn bus_call_started() {
    metrics::gauge!("gateway_bus_calls_in_flight").increment(1.0);
}

/// A bus call completed, successfully or not.
pub fn record_bus_call(interface: &str, member: &str, outcome: &str, start: Instant) {
    metrics::gauge!("gateway_bus_calls_in_flight").decrement(1.0);
    let labels = [
        ("interface", interface.to_string()),
        ("member", member.to_string()),
        ("outcome", outcome.to_string()),
    ];
    metrics::counter!("gateway_bus_calls_total", &labels).increment(1);
    metrics::histogram!("gateway_bus_call_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reconcile_action(kind: &'static str) {
    metrics::counter!("gateway_reconcile_actions_total", "kind" => kind).increment(1);
}
