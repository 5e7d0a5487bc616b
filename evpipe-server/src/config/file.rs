//! TOML file configuration structures.
//!
//! These structs directly map to the `evpipe-config.toml` file format.

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub throttling: ThrottlingConfig,
    pub external_service: ExternalServiceConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Inbound source section.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Topic accepted by the ingest endpoint.
    pub topic: String,
    /// Maximum number of records processed at once.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    16
}

/// Delivery throttling section.
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottlingConfig {
    /// Deliveries admitted per period.
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    /// Window length in milliseconds.
    #[serde(default = "default_period_millis")]
    pub period_millis: u64,
}

impl Default for ThrottlingConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            period_millis: default_period_millis(),
        }
    }
}

fn default_max_count() -> u32 {
    1
}

fn default_period_millis() -> u64 {
    1000
}

/// External service section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalServiceConfig {
    /// Endpoint receiving the transformed events.
    pub url: String,
    /// Timeout for the rate-limit wait and for each request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[source]
topic = "events"
workers = 4

[throttling]
max_count = 5
period_millis = 250

[external_service]
url = "http://localhost:9000/ingest"
timeout_secs = 10
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.source.topic, "events");
        assert_eq!(config.source.workers, 4);
        assert_eq!(config.throttling.max_count, 5);
        assert_eq!(config.throttling.period_millis, 250);
        assert_eq!(config.external_service.url, "http://localhost:9000/ingest");
        assert_eq!(config.external_service.timeout_secs, 10);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let toml_str = r#"
[source]
topic = "events"

[external_service]
url = "http://localhost:9000/ingest"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.source.workers, 16);
        assert_eq!(config.throttling.max_count, 1);
        assert_eq!(config.throttling.period_millis, 1000);
        assert_eq!(config.external_service.timeout_secs, 30);
    }

    #[test]
    fn test_missing_external_service_is_rejected() {
        let toml_str = r#"
[source]
topic = "events"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
