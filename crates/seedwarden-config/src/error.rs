//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path being accessed.
        path: PathBuf,
        /// Source IO error.
        #[source]
        source: io::Error,
    },
    /// The document is not valid YAML or does not match the schema.
    #[error("configuration document is malformed")]
    Parse {
        /// Source deserialization error.
        #[source]
        source: serde_yaml::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A client referenced a filter that is not defined.
    #[error("unknown filter")]
    UnknownFilter {
        /// Filter name requested.
        filter: String,
    },
    /// A client name was requested that is not configured.
    #[error("unknown client")]
    UnknownClient {
        /// Client name requested.
        client: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
