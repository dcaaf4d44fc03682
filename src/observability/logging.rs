//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick pretty or JSON console output
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - A bare level (`info`) applies to this crate and tower_http only

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the subscriber. Safe to call twice; the second call is ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let directive = if config.log_level.contains('=') {
        config.log_level.clone()
    } else {
        format!("stt_proxy={0},tower_http={0}", config.log_level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let json = config.log_format == LogFormat::Json;
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .try_init();
}
