//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (requests, admission, token refresh, dispatch, janitor)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_requests_total` (counter): submissions by outcome
//! - `relay_rate_limited_total` (counter): submissions refused by admission
//! - `relay_token_refresh_total` (counter): token exchanges by result
//! - `relay_auth_retries_total` (counter): retries after a token rejection, by operation
//! - `relay_dispatch_tasks_total` (counter): queue tasks by result
//! - `relay_dispatch_queue_depth` (gauge): tasks waiting in the queue
//! - `relay_dispatch_batch_seconds` (histogram): wall time per batch
//! - `relay_janitor_deleted_total` / `relay_janitor_errors_total` (counters)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are static strings to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::storage::SweepReport;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str) {
    metrics::counter!("relay_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("relay_rate_limited_total").increment(1);
}

pub fn record_token_refresh(succeeded: bool) {
    metrics::counter!("relay_token_refresh_total", "result" => result_label(succeeded)).increment(1);
}

pub fn record_auth_retry(operation: &'static str) {
    metrics::counter!("relay_auth_retries_total", "operation" => operation).increment(1);
}

pub fn record_dispatch_task(succeeded: bool) {
    metrics::counter!("relay_dispatch_tasks_total", "result" => result_label(succeeded)).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("relay_dispatch_queue_depth").set(depth as f64);
}

pub fn record_dispatch_batch(elapsed: Duration) {
    metrics::histogram!("relay_dispatch_batch_seconds").record(elapsed.as_secs_f64());
}

pub fn record_janitor(report: &SweepReport) {
    metrics::counter!("relay_janitor_deleted_total").increment(report.deleted as u64);
    metrics::counter!("relay_janitor_errors_total").increment(report.errors as u64);
}

fn result_label(succeeded: bool) -> &'static str {
    if succeeded {
        "success"
    } else {
        "failure"
    }
}
