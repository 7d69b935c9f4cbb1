//! Error types for Colloquy
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Colloquy operations
///
/// This enum covers the full error taxonomy of the client: configuration
/// problems, request failures reported by the backend (4xx/5xx),
/// connectivity failures where no response was received, malformed data
/// encountered during import/parse, and local storage failures.
#[derive(Error, Debug)]
pub enum ColloquyError {
    /// Configuration-related errors (missing/invalid credentials or endpoint)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request-level errors reported by the backend with an HTTP status
    ///
    /// The message is already mapped to a human-readable form; `status`
    /// is retained for programmatic checks.
    #[error("{message}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// Human-readable error message
        message: String,
    },

    /// Network/connectivity errors where no response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed data encountered during import or response parsing
    #[error("Invalid data: {0}")]
    Malformed(String),

    /// Local storage errors (key-value store operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client errors that were not classified further
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Colloquy operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ColloquyError::Config("API key and base URL are required".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: API key and base URL are required"
        );
    }

    #[test]
    fn test_api_error_display_is_bare_message() {
        let error = ColloquyError::Api {
            status: 401,
            message: "Unauthorized - Invalid API key".to_string(),
        };
        assert_eq!(error.to_string(), "Unauthorized - Invalid API key");
    }

    #[test]
    fn test_network_error_display() {
        let error =
            ColloquyError::Network("no response received - please check your connection".into());
        assert!(error.to_string().starts_with("Network error:"));
    }

    #[test]
    fn test_malformed_error_display() {
        let error = ColloquyError::Malformed("conversation data has no messages array".into());
        assert_eq!(
            error.to_string(),
            "Invalid data: conversation data has no messages array"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let error = ColloquyError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ColloquyError = io_error.into();
        assert!(matches!(error, ColloquyError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: ColloquyError = json_error.into();
        assert!(matches!(error, ColloquyError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ColloquyError>();
    }
}
