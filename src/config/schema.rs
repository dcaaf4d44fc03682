//! Configuration schema definitions.
//!
//! This module defines the process configuration for the proxy.
//! All types derive Serde traits for deserialization from TOML files.
//! The override rules themselves live in a separate JSON document, see
//! [`crate::config::rules`].

use serde::{Deserialize, Serialize};

/// Root configuration for the STT proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream transcription service.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Where the override rules come from and how they are encoded.
    pub rules: RulesConfig,

    /// Request classification.
    pub routing: RoutingConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:10241").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:10241".to_string(),
        }
    }
}

/// Upstream STT service and its connection pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream authority (e.g., "localhost:10240").
    pub address: String,

    /// Maximum concurrent in-flight upstream requests.
    pub max_connections: usize,

    /// Maximum idle keep-alive connections kept in the pool.
    pub max_idle_per_host: usize,

    /// Speak HTTP/2 to the upstream without negotiation (h2c prior knowledge).
    pub http2_prior_knowledge: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "localhost:10240".to_string(),
            max_connections: 20,
            max_idle_per_host: 10,
            http2_prior_knowledge: false,
        }
    }
}

/// Timeout configuration for upstream operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds. Also bounds the wait
    /// for a free pool slot.
    pub connect_secs: u64,

    /// Time allowed for the upstream to produce response headers, in seconds.
    pub read_secs: u64,

    /// Idle keep-alive connection timeout in seconds.
    pub idle_secs: u64,

    /// Hard ceiling for a whole request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            read_secs: 300,
            idle_secs: 300,
            request_secs: 600,
        }
    }
}

/// Wire encoding for list-valued override rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListEncoding {
    /// Single field, elements joined with commas: `-1,50257`.
    #[default]
    Comma,
    /// One field per element, all sharing the rule's name.
    Repeated,
    /// Single field holding the JSON array text: `[-1,50257]`.
    Json,
}

/// Override rules source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Path to the JSON rules document.
    pub path: String,

    /// How list values are written into the outbound form.
    pub list_encoding: ListEncoding,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: "config/stt_config.json".to_string(),
            list_encoding: ListEncoding::Comma,
        }
    }
}

/// Request classification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Path suffix identifying the transcription endpoint.
    pub transcription_suffix: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            transcription_suffix: "/audio/transcriptions".to_string(),
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum multipart body size accepted on the transcription route.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Console output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            address = "10.0.0.5:10240"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.address, "10.0.0.5:10240");
        assert_eq!(config.upstream.max_connections, 20);
        assert_eq!(config.listener.bind_address, "0.0.0.0:10241");
        assert_eq!(config.rules.list_encoding, ListEncoding::Comma);
    }

    #[test]
    fn list_encoding_is_lowercase() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [rules]
            path = "rules.json"
            list_encoding = "repeated"
            "#,
        )
        .unwrap();

        assert_eq!(config.rules.list_encoding, ListEncoding::Repeated);
        assert_eq!(config.rules.path, "rules.json");
    }
}
