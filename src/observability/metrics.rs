//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, overrides, upstream errors)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `stt_proxy_requests_total` (counter): requests by kind, status
//! - `stt_proxy_request_duration_seconds` (histogram): latency by kind
//! - `stt_proxy_overridden_fields_total` (counter): applied rules by field
//! - `stt_proxy_errors_total` (counter): local failures by error kind
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Field labels are bounded by the rule set, never by client input

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::RequestKind;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(kind: RequestKind, status: u16, start: Instant) {
    counter!(
        "stt_proxy_requests_total",
        "kind" => kind.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("stt_proxy_request_duration_seconds", "kind" => kind.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_override(field: &str) {
    counter!("stt_proxy_overridden_fields_total", "field" => field.to_string()).increment(1);
}

pub fn record_error(kind: &'static str) {
    counter!("stt_proxy_errors_total", "kind" => kind).increment(1);
}
