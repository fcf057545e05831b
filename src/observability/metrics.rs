//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hopper_requests_total` (counter): hop requests by outcome, status
//! - `hopper_request_duration_seconds` (histogram): handler latency by outcome
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// How a hop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Answered locally at `/`.
    Terminal,
    /// Relayed an upstream response.
    Forwarded,
    /// Upstream call failed.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Terminal => "terminal",
            Outcome::Forwarded => "forwarded",
            Outcome::Failed => "failed",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished hop request.
pub fn record_hop(outcome: Outcome, status: u16, start: Instant) {
    let outcome = outcome.as_str();
    metrics::counter!(
        "hopper_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("hopper_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
