//! Transcription request rewriting.
//!
//! # Data Flow
//! ```text
//! inbound Form + OverrideRules
//!     → engine.rs (apply_overrides)
//!     → Rewrite { outbound Form, OverrideEvent[] }
//!     → events logged and counted by the HTTP handler
//! ```

pub mod engine;

pub use engine::{apply_overrides, OverrideEvent, Rewrite};
