use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Document store connection configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Host and port, optionally with a `mongodb://` scheme (default: "localhost:27017").
    #[serde(default = "default_host")]
    pub host: String,

    /// Authentication database.
    #[serde(default)]
    pub auth_source: String,

    /// Authentication username.
    #[serde(default)]
    pub username: String,

    /// Authentication password.
    #[serde(default)]
    pub password: String,

    /// Database holding the event sources (default: "esm").
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection holding the event sources (default: "eventsources").
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Connect and server selection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound for each store operation (ping, find, cursor drain) in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    /// Keep the client between scrapes instead of reconnecting every time.
    #[serde(default = "default_reuse_connection")]
    pub reuse_connection: bool,
}

fn default_host() -> String {
    "localhost:27017".to_string()
}

fn default_database() -> String {
    "esm".to_string()
}

fn default_collection() -> String {
    "eventsources".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_operation_timeout() -> u64 {
    10
}

fn default_reuse_connection() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            auth_source: String::new(),
            username: String::new(),
            password: String::new(),
            database: default_database(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout(),
            operation_timeout_secs: default_operation_timeout(),
            reuse_connection: default_reuse_connection(),
        }
    }
}

impl StoreConfig {
    /// True when any credential field is set.
    pub fn has_credentials(&self) -> bool {
        !self.auth_source.is_empty() || !self.username.is_empty() || !self.password.is_empty()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("auth_source", &self.auth_source)
            .field("username", &self.username)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "<redacted>" },
            )
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .field("reuse_connection", &self.reuse_connection)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
