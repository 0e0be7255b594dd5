//! Metrics collection.
//!
//! # Responsibilities
//! - Count dispatched requests by method, status and outcome
//! - Record dispatch latency
//! - Count server starts by outcome
//!
//! # Metrics
//! - `stub_requests_total` (counter): dispatched requests by method, status, outcome
//! - `stub_request_duration_seconds` (histogram): time spent in dispatch
//! - `stub_server_starts_total` (counter): start attempts by outcome
//!
//! # Design Decisions
//! - Uses the `metrics` facade only; the harness installs a recorder if it wants one
//! - Without a recorder every call is a no-op

use std::time::Instant;

use metrics::{counter, histogram};

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start_time: Instant) {
    counter!(
        "stub_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("stub_request_duration_seconds", "method" => method.to_string())
        .record(start_time.elapsed().as_secs_f64());
}

/// Record the outcome of a `start` call.
pub fn record_start(outcome: &'static str) {
    counter!("stub_server_starts_total", "outcome" => outcome).increment(1);
}
