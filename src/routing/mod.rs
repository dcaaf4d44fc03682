//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → /health, /stats: local handlers (admin)
//!     → anything else: classifier.rs
//!         → Stt: multipart rewrite, then forward
//!         → Passthrough: forward unchanged
//! ```
//!
//! # Design Decisions
//! - Classifier built at startup, immutable at runtime
//! - No regex in hot path (suffix matching only)
//! - Deterministic: same input always classifies the same way

pub mod classifier;

pub use classifier::{Classifier, RequestKind};
