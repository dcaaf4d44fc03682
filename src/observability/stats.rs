//! Process-wide request counters.
//!
//! # Responsibilities
//! - Count proxied requests by kind, applied overrides and failures
//! - Keep proxy-local failures apart from upstream non-2xx answers
//! - Provide a consistent-enough snapshot for `GET /stats`
//!
//! # Design Decisions
//! - Plain atomics: readers never block request processing
//! - One [`RequestRecord`] per request writes everything on drop, so a
//!   request is counted exactly once even if the client goes away
//! - Owned by the server state and passed by `Arc`, no global

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::http::StatusCode;
use serde::Serialize;

use crate::routing::RequestKind;

#[derive(Debug)]
pub struct Stats {
    total_requests: AtomicU64,
    stt_requests: AtomicU64,
    passthrough_requests: AtomicU64,
    overridden_fields: AtomicU64,
    errors: AtomicU64,
    upstream_rejected: AtomicU64,
    started_at: Instant,
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub stt_requests: u64,
    pub passthrough_requests: u64,
    pub overridden_fields: u64,
    /// Requests the proxy itself failed (4xx/5xx it generated, or abandoned).
    pub errors: u64,
    /// Upstream non-2xx responses relayed to the client.
    pub upstream_rejected: u64,
    pub uptime_secs: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            stt_requests: AtomicU64::new(0),
            passthrough_requests: AtomicU64::new(0),
            overridden_fields: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            upstream_rejected: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Start accounting for one request.
    pub fn begin(&self, kind: RequestKind) -> RequestRecord<'_> {
        RequestRecord {
            stats: self,
            kind,
            overridden: 0,
            outcome: Outcome::Abandoned,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            stt_requests: self.stt_requests.load(Ordering::Relaxed),
            passthrough_requests: self.passthrough_requests.load(Ordering::Relaxed),
            overridden_fields: self.overridden_fields.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            upstream_rejected: self.upstream_rejected.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    fn commit(&self, record: &RequestRecord<'_>) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match record.kind {
            RequestKind::Stt => self.stt_requests.fetch_add(1, Ordering::Relaxed),
            RequestKind::Passthrough => self.passthrough_requests.fetch_add(1, Ordering::Relaxed),
        };
        if record.overridden > 0 {
            self.overridden_fields.fetch_add(record.overridden, Ordering::Relaxed);
        }
        match record.outcome {
            Outcome::Relayed(status) if status.is_success() => {}
            Outcome::Relayed(_) => {
                self.upstream_rejected.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed | Outcome::Abandoned => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    /// Upstream answered; its status went to the client unchanged.
    Relayed(StatusCode),
    /// The proxy answered with its own error.
    Failed,
    /// Handler dropped before finishing (client gone, request ceiling hit).
    Abandoned,
}

/// Per-request accounting guard. Commits to [`Stats`] when dropped.
///
/// A record dropped without being closed counts as an error.
#[derive(Debug)]
pub struct RequestRecord<'a> {
    stats: &'a Stats,
    kind: RequestKind,
    overridden: u64,
    outcome: Outcome,
}

impl RequestRecord<'_> {
    pub fn add_overrides(&mut self, count: usize) {
        self.overridden += count as u64;
    }

    /// Close the record with the upstream status relayed to the client.
    pub fn relayed(mut self, status: StatusCode) {
        self.outcome = Outcome::Relayed(status);
    }

    /// Close the record for a request the proxy answered with an error.
    pub fn failed(mut self) {
        self.outcome = Outcome::Failed;
    }
}

impl Drop for RequestRecord<'_> {
    fn drop(&mut self) {
        self.stats.commit(self);
    }
}
