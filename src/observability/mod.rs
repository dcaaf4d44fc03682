//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handlers produce:
//!     → logging.rs (structured log events, per-request spans)
//!     → metrics.rs (counters, histograms)
//!     → stats.rs (counters served by GET /stats)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//!     → /stats JSON
//! ```
//!
//! # Design Decisions
//! - Request ID flows through logs and responses
//! - Counters are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod stats;

pub use stats::{RequestRecord, Stats, StatsSnapshot};
