//! Request-level error taxonomy.
//!
//! Every variant maps to a well-formed HTTP response, see
//! `http::response`. Upstream non-2xx responses are not errors here: they
//! are relayed verbatim.

use std::time::Duration;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Configuration unusable at startup.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// No upstream connection could be established in time.
    #[error("upstream unavailable: {0}")]
    ConnectFailed(String),

    /// Upstream did not answer within the read timeout.
    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    /// Transcription body could not be parsed as multipart/form-data.
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// Transcription body exceeded the configured limit.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Transport failure after the connection was established.
    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl ProxyError {
    /// Stable short name used in JSON error bodies, logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::ConfigInvalid(_) => "config_invalid",
            ProxyError::ConnectFailed(_) => "connect_failed",
            ProxyError::UpstreamTimeout(_) => "upstream_timeout",
            ProxyError::MalformedMultipart(_) => "malformed_multipart",
            ProxyError::PayloadTooLarge(_) => "payload_too_large",
            ProxyError::Upstream(_) => "upstream_error",
        }
    }
}

impl From<ConfigError> for ProxyError {
    fn from(err: ConfigError) -> Self {
        ProxyError::ConfigInvalid(err.to_string())
    }
}
