//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! proxy.toml (optional) + CLI flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!
//! stt_config.json
//!     → loader.rs (read)
//!     → rules.rs (OverrideRules, immutable)
//!     → shared via Arc with the request handlers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod rules;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_rules, ConfigError};
pub use rules::{OverrideRules, RuleValue, RulesError, Scalar};
pub use schema::{
    ListEncoding, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RulesConfig,
    TimeoutConfig, UpstreamConfig,
};
