//! ESM Common Library
//!
//! Shared types and utilities for the ESM event source exporter:
//!
//! - [`document`] - Event source document view and decode error types
//! - [`session`] - Document store session management (connect, liveness, release)
//! - [`config`] - Store and logging configuration sections
//! - [`error`] - Error types

pub mod config;
pub mod document;
pub mod error;
pub mod session;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LoggingConfig, StoreConfig};
pub use document::{DecodeError, EventSourceDocument, ValueKind};
pub use error::{Error, Result};
pub use session::{SessionManager, StoreSession, normalize_host_uri};

// Re-export the BSON types documents are expressed in
pub use mongodb::bson;

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
