//! # Design
//!
//! - Centralize application-level errors for bootstrap and orchestration.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Per-torrent and per-backend failures are logged where they happen; only the
//!   aggregate outcome surfaces here.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedwarden_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedwarden_telemetry::TelemetryError,
    },
    /// Building a backend adapter failed.
    #[error("backend client construction failed")]
    Qbit {
        /// Operation identifier.
        operation: &'static str,
        /// Configured client name.
        client: String,
        /// Source adapter error.
        source: seedwarden_qbittorrent::QbitError,
    },
    /// A per-backend task panicked or was cancelled.
    #[error("backend task did not complete")]
    Join {
        /// Operation identifier.
        operation: &'static str,
        /// Configured client name.
        client: String,
        /// Source join error.
        source: tokio::task::JoinError,
    },
    /// One or more backends failed their run.
    #[error("backend runs failed")]
    BackendFailures {
        /// Number of failed backends.
        failed: usize,
        /// Number of backends attempted.
        total: usize,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seedwarden_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedwarden_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn qbit(
        operation: &'static str,
        client: String,
        source: seedwarden_qbittorrent::QbitError,
    ) -> Self {
        Self::Qbit {
            operation,
            client,
            source,
        }
    }

    pub(crate) const fn join(
        operation: &'static str,
        client: String,
        source: tokio::task::JoinError,
    ) -> Self {
        Self::Join {
            operation,
            client,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "config.load",
            seedwarden_config::ConfigError::UnknownClient {
                client: "nas".to_string(),
            },
        );
        assert!(matches!(
            config,
            AppError::Config {
                operation: "config.load",
                ..
            }
        ));
        assert!(config.source().is_some());

        let telemetry = AppError::telemetry(
            "telemetry.init",
            seedwarden_telemetry::TelemetryError::UnknownLogFormat {
                value: "xml".to_string(),
            },
        );
        assert!(matches!(telemetry, AppError::Telemetry { .. }));

        let qbit = AppError::qbit(
            "qbittorrent.new",
            "seedbox".to_string(),
            seedwarden_qbittorrent::QbitError::Auth {
                body: "Fails.".to_string(),
            },
        );
        assert!(matches!(qbit, AppError::Qbit { ref client, .. } if client == "seedbox"));
    }

    #[test]
    fn backend_failures_message_is_constant() {
        let err = AppError::BackendFailures {
            failed: 1,
            total: 3,
        };
        assert_eq!(err.to_string(), "backend runs failed");
    }
}
