//! Configuration for the Prometheus exporter.

use esm_common::{LoggingConfig, StoreConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::mapping::ExportProfile;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Document store connection settings.
    #[serde(default)]
    pub mongodb: StoreConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:15700").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,

    /// Metric family layout (default: "event_source").
    #[serde(default)]
    pub profile: ExportProfile,
}

/// Port the exporter listens on when nothing else is configured.
pub const DEFAULT_PORT: &str = "15700";

fn default_listen() -> String {
    format!("0.0.0.0:{}", DEFAULT_PORT)
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            profile: ExportProfile::default(),
        }
    }
}

/// Turn a bare port (optionally written as ":port") into a listen address on all interfaces.
pub fn listen_address_for_port(port: &str) -> Result<String, ConfigError> {
    let port = port.trim().trim_start_matches(':');
    let port: u16 = port
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid local port: '{}'", port)))?;

    Ok(format!("0.0.0.0:{}", port))
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ExporterConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.prometheus.listen.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            ))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mongodb.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mongodb.host must not be empty".to_string(),
            ));
        }

        if self.mongodb.database.is_empty() || self.mongodb.collection.is_empty() {
            return Err(ConfigError::Validation(
                "mongodb.database and mongodb.collection must not be empty".to_string(),
            ));
        }

        if self.mongodb.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connect_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.mongodb.operation_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "operation_timeout_secs must be > 0".to_string(),
            ));
        }

        self.listen_addr()?;

        // Validate path starts with /
        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        Ok(())
    }
}
