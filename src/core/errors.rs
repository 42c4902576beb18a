//! Error types for the metrik-rs library.
//!
//! This module provides structured error handling for all metrik operations,
//! preserving context so that failures can be reported precisely by callers
//! embedding the analysis core.

use std::io;

use thiserror::Error;

/// Main result type for metrik operations.
pub type Result<T> = std::result::Result<T, MetrikError>;

/// Comprehensive error type for all metrik operations.
#[derive(Error, Debug)]
pub enum MetrikError {
    /// I/O related errors (cache files, coverage reports)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// An analyzer received a dependency it does not accept
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error description
        message: String,
    },

    /// An analyzer ran without a declared prerequisite analyzer
    #[error("Analyzer '{analyzer}' requires analyzer '{required}' which was not supplied")]
    MissingAnalyzer {
        /// The analyzer that was about to run
        analyzer: String,
        /// The prerequisite that is missing
        required: String,
    },

    /// Parsing errors for external inputs (coverage reports, configuration)
    #[error("Parse error in {format}: {message}")]
    Parse {
        /// Input format being parsed (e.g. "clover-xml", "yaml")
        format: String,
        /// Error description
        message: String,
    },

    /// Cache and storage errors
    #[error("Cache error: {message}")]
    Cache {
        /// Error description
        message: String,
        /// Cache key that caused the issue
        key: Option<String>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

impl MetrikError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new invalid-argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new missing-analyzer error
    pub fn missing_analyzer(analyzer: impl Into<String>, required: impl Into<String>) -> Self {
        Self::MissingAnalyzer {
            analyzer: analyzer.into(),
            required: required.into(),
        }
    }

    /// Create a new parse error
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            key: None,
        }
    }

    /// Create a new cache error with key context
    pub fn cache_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Implement From traits for common error types
impl From<io::Error> for MetrikError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for MetrikError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for MetrikError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<bincode::Error> for MetrikError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization {
            message: format!("Binary serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MetrikError::config("Invalid configuration");
        assert!(matches!(err, MetrikError::Config { .. }));

        let err = MetrikError::invalid_argument("wrong analyzer type");
        assert!(matches!(err, MetrikError::InvalidArgument { .. }));
    }

    #[test]
    fn test_missing_analyzer_message() {
        let err = MetrikError::missing_analyzer("crap-index", "cyclomatic-complexity");
        let message = err.to_string();
        assert!(message.contains("crap-index"));
        assert!(message.contains("cyclomatic-complexity"));
    }

    #[test]
    fn test_config_field_error() {
        let err = MetrikError::config_field("Invalid value", "coderank.strategies");

        if let MetrikError::Config { message, field } = err {
            assert_eq!(message, "Invalid value");
            assert_eq!(field, Some("coderank.strategies".to_string()));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_io_error_creation() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let err = MetrikError::io("Failed to write cache entry", io_err);

        if let MetrikError::Io { message, source } = &err {
            assert_eq!(message, "Failed to write cache entry");
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        } else {
            panic!("Expected Io error");
        }
    }
}
