//! Startup orchestration.
//!
//! # Responsibilities
//! - Merge the optional TOML file with command-line flags
//! - Load and validate configuration
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Flags override the file; the file overrides defaults
//! - The listener binds last (traffic only when ready)

use std::path::PathBuf;

use tokio::net::TcpListener;

use crate::config::validation::validate_config;
use crate::config::{load_config, ConfigError, ProxyConfig};

/// Command-line overrides for [`ProxyConfig`].
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub target_host: Option<String>,
    pub target_port: Option<u16>,
    pub rules_path: Option<PathBuf>,
}

/// Resolve the effective configuration.
pub fn resolve_config(overrides: &Overrides) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &overrides.config_path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if overrides.host.is_some() || overrides.port.is_some() {
        let (default_host, default_port) = split_host_port(&config.listener.bind_address);
        let host = overrides.host.clone().unwrap_or(default_host);
        let port = overrides.port.unwrap_or(default_port);
        config.listener.bind_address = join_host_port(&host, port);
    }

    if overrides.target_host.is_some() || overrides.target_port.is_some() {
        let (default_host, default_port) = split_host_port(&config.upstream.address);
        let host = overrides.target_host.clone().unwrap_or(default_host);
        let port = overrides.target_port.unwrap_or(default_port);
        config.upstream.address = join_host_port(&host, port);
    }

    if let Some(path) = &overrides.rules_path {
        config.rules.path = path.display().to_string();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

pub async fn bind(config: &ProxyConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(&config.listener.bind_address).await
}

fn split_host_port(address: &str) -> (String, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => (
            host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port.parse().unwrap_or(0),
        ),
        None => (address.to_string(), 0),
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = resolve_config(&Overrides {
            port: Some(9000),
            target_host: Some("stt.internal".into()),
            rules_path: Some(PathBuf::from("/etc/stt/rules.json")),
            ..Overrides::default()
        })
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.upstream.address, "stt.internal:10240");
        assert_eq!(config.rules.path, "/etc/stt/rules.json");
    }

    #[test]
    fn hostname_bind_is_accepted() {
        let config = resolve_config(&Overrides {
            host: Some("localhost".into()),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(config.listener.bind_address, "localhost:10241");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let config = resolve_config(&Overrides {
            host: Some("::1".into()),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(config.listener.bind_address, "[::1]:10241");
    }
}
