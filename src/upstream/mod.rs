//! Upstream access subsystem.
//!
//! # Data Flow
//! ```text
//! prepared request (method, path, headers, body)
//!     → forwarder.rs (target rewrite, hop headers, read timeout)
//!     → pool.rs (slot acquisition, pooled keep-alive client)
//!     → upstream STT service
//!     → forwarder.rs (relay status/headers, streaming body)
//! ```

pub mod forwarder;
pub mod pool;

pub use forwarder::Forwarder;
pub use pool::{Connection, ConnectionManager};
