use std::time::Duration;

use thiserror::Error;

/// Common error type for document store access.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to document store: {0}")]
    Connect(String),

    #[error("Document store liveness check failed: {0}")]
    Ping(String),

    #[error("Query against collection '{collection}' failed: {message}")]
    Query { collection: String, message: String },

    #[error("Cursor iteration failed: {0}")]
    Cursor(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

impl Error {
    /// Whether the error means the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Connect(_) | Error::Ping(_))
    }
}

/// Result type alias using the store [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            operation: "find",
            timeout: Duration::from_secs(3),
        };
        assert_eq!(err.to_string(), "find timed out after 3s");
    }

    #[test]
    fn test_is_unavailable() {
        assert!(Error::Connect("refused".to_string()).is_unavailable());
        assert!(Error::Ping("no primary".to_string()).is_unavailable());
        assert!(!Error::Cursor("killed".to_string()).is_unavailable());
        assert!(
            !Error::Query {
                collection: "eventsources".to_string(),
                message: "unauthorized".to_string(),
            }
            .is_unavailable()
        );
    }
}
