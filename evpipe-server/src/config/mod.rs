//! Configuration module for evpipe-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables, then validates it into the runtime
//! types used by the pipeline.

pub mod file;

use crate::config::file::FileConfig;
use evpipe_core::config::{ExternalServiceConfig, PipelineConfig, SourceConfig, ThrottleConfig};
use std::net::SocketAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Server-only settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    url_override: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            url_override: None,
        }
    }

    /// Replace the external service URL from the file.
    pub fn with_url_override(mut self, url: Option<String>) -> Self {
        self.url_override = url;
        self
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate and convert the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(url) = &self.url_override {
            file_config.external_service.url = url.clone();
        }

        build_loaded_config(file_config)
    }
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let source = &file_config.source;
    if source.topic.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "source.topic must not be empty".to_string(),
        ));
    }
    let workers = NonZeroUsize::new(source.workers).ok_or_else(|| {
        ConfigError::ValidationError("source.workers must be at least 1".to_string())
    })?;

    let throttling = &file_config.throttling;
    let max_count = NonZeroU32::new(throttling.max_count).ok_or_else(|| {
        ConfigError::ValidationError("throttling.max_count must be at least 1".to_string())
    })?;
    if throttling.period_millis == 0 {
        return Err(ConfigError::ValidationError(
            "throttling.period_millis must be at least 1".to_string(),
        ));
    }

    let external = &file_config.external_service;
    let url = Url::parse(&external.url).map_err(|e| {
        ConfigError::ValidationError(format!(
            "external_service.url {:?} is invalid: {e}",
            external.url
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "external_service.url must use http or https, got {}",
            url.scheme()
        )));
    }
    if external.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "external_service.timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        pipeline: PipelineConfig {
            source: SourceConfig {
                topic: source.topic.clone(),
                workers,
            },
            throttling: ThrottleConfig {
                max_count,
                period: Duration::from_millis(throttling.period_millis),
            },
            external_service: ExternalServiceConfig {
                url,
                timeout: Duration::from_secs(external.timeout_secs),
            },
        },
    })
}
