//! CLI argument parsing.
//!
//! Option names follow the flags existing deployments already pass
//! (`--mongoDbHostURI`, `--localPort`, ...). Anything given on the command line
//! overrides the configuration file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, ExporterConfig, listen_address_for_port};

/// Prometheus exporter for ESM event sources.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "esm-exporter-prometheus")]
#[command(about = "Export ESM event sources stored in MongoDB as Prometheus metrics")]
#[command(version)]
pub struct ExporterArgs {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// MongoDB host URI [default: localhost:27017].
    #[arg(long = "mongoDbHostURI", value_name = "URI")]
    pub mongo_db_host_uri: Option<String>,

    /// MongoDB authentication source.
    #[arg(long = "mongoDbAuthSource", value_name = "DB")]
    pub mongo_db_auth_source: Option<String>,

    /// MongoDB authentication username.
    #[arg(long = "mongoDbUsername", value_name = "USER")]
    pub mongo_db_username: Option<String>,

    /// MongoDB authentication password.
    #[arg(long = "mongoDbPassword", value_name = "PASSWORD")]
    pub mongo_db_password: Option<String>,

    /// Exporter listening port [default: 15700].
    #[arg(long = "localPort", value_name = "PORT")]
    pub local_port: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ExporterArgs {
    /// Load the configuration file (or defaults) and apply CLI overrides.
    pub fn resolve_config(&self) -> Result<ExporterConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::load_from_file(path)?,
            None => ExporterConfig::default(),
        };

        self.apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Overwrite configuration values with those given on the command line.
    pub fn apply(&self, config: &mut ExporterConfig) -> Result<(), ConfigError> {
        if let Some(host) = &self.mongo_db_host_uri {
            config.mongodb.host = host.clone();
        }
        if let Some(source) = &self.mongo_db_auth_source {
            config.mongodb.auth_source = source.clone();
        }
        if let Some(username) = &self.mongo_db_username {
            config.mongodb.username = username.clone();
        }
        if let Some(password) = &self.mongo_db_password {
            config.mongodb.password = password.clone();
        }
        if let Some(port) = &self.local_port {
            config.prometheus.listen = listen_address_for_port(port)?;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        Ok(())
    }
}
