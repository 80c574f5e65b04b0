//! Error types for torrent client operations.
//!
//! # Design
//! - Keep error messages constant; store operational context in fields.
//! - Every backend failure carries the operation name and, when known, the torrent hash.
//! - Sources are boxed so adapters can surface their own transport errors unchanged.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::policy::{PolicyError, PredicateError};
use crate::removal::RemovalStep;
use crate::rules::EvalError;

/// Boxed error used to carry adapter-specific failures.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Primary error type for torrent client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Establishing a backend session failed.
    #[error("backend connection failed")]
    Connect {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// Backend reported an API version older than the supported floor.
    #[error("backend api version is not supported")]
    UnsupportedVersion {
        /// Version string reported by the backend.
        reported: String,
        /// Minimum version accepted.
        minimum: &'static str,
    },
    /// Fetching the torrent list or a per-torrent detail failed.
    #[error("torrent fetch failed")]
    Fetch {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent hash when the failure is tied to one torrent.
        hash: Option<String>,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// A predicate produced something other than a boolean.
    #[error("predicate returned a non-boolean result")]
    PredicateType {
        /// Torrent being classified.
        hash: String,
        /// Rule group being evaluated.
        rule: String,
        /// Position of the predicate within the group.
        index: usize,
        /// Kind of value the predicate produced.
        found: &'static str,
    },
    /// A predicate faulted while evaluating.
    #[error("predicate evaluation failed")]
    PredicateEval {
        /// Torrent being classified.
        hash: String,
        /// Rule group being evaluated.
        rule: String,
        /// Position of the predicate within the group.
        index: usize,
        /// Underlying evaluation fault.
        #[source]
        source: EvalError,
    },
    /// Backend rejected a label change.
    #[error("torrent label rejected")]
    Label {
        /// Torrent being relabeled.
        hash: String,
        /// Requested label.
        label: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// One step of the removal sequence failed.
    #[error("torrent removal step failed")]
    RemovalStep {
        /// Step that failed.
        step: RemovalStep,
        /// Torrent being removed.
        hash: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// Querying free disk space failed.
    #[error("disk space query failed")]
    DiskQuery {
        /// Path that was queried.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Convenience alias for torrent client results.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Wrap a policy evaluation failure with the hash of the torrent being classified.
    #[must_use]
    pub fn policy(hash: &str, error: PolicyError) -> Self {
        let PolicyError { rule, source } = error;
        match source {
            PredicateError::NonBoolean { index, found } => Self::PredicateType {
                hash: hash.to_string(),
                rule: rule.to_string(),
                index,
                found,
            },
            PredicateError::Evaluation { index, source } => Self::PredicateEval {
                hash: hash.to_string(),
                rule: rule.to_string(),
                index,
                source,
            },
        }
    }

    /// Torrent hash associated with the failure, if any.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Fetch { hash, .. } => hash.as_deref(),
            Self::PredicateType { hash, .. }
            | Self::PredicateEval { hash, .. }
            | Self::Label { hash, .. }
            | Self::RemovalStep { hash, .. } => Some(hash),
            Self::Connect { .. } | Self::UnsupportedVersion { .. } | Self::DiskQuery { .. } => {
                None
            }
        }
    }

    /// Whether the failure invalidates the whole run against this backend.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::UnsupportedVersion { .. }
                | Self::Fetch { .. }
                | Self::DiskQuery { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RuleGroup;

    #[test]
    fn policy_errors_map_to_typed_variants() {
        let non_bool = ClientError::policy(
            "abc",
            PolicyError {
                rule: RuleGroup::Remove,
                source: PredicateError::NonBoolean {
                    index: 2,
                    found: "float",
                },
            },
        );
        assert!(matches!(
            &non_bool,
            ClientError::PredicateType { hash, rule, index: 2, found: "float" }
                if hash == "abc" && rule == "remove"
        ));
        assert_eq!(non_bool.hash(), Some("abc"));

        let eval = ClientError::policy(
            "def",
            PolicyError {
                rule: RuleGroup::Label("archive".into()),
                source: PredicateError::Evaluation {
                    index: 0,
                    source: EvalError::TypeMismatch {
                        operation: "not",
                        expected: "bool",
                        found: "text",
                    },
                },
            },
        );
        assert!(matches!(
            &eval,
            ClientError::PredicateEval { rule, .. } if rule == "label:archive"
        ));
        assert!(!eval.is_fatal());
    }

    #[test]
    fn connection_failures_are_fatal() {
        let err = ClientError::UnsupportedVersion {
            reported: "2.1".into(),
            minimum: "2.2",
        };
        assert!(err.is_fatal());
        assert!(err.hash().is_none());
        assert_eq!(err.to_string(), "backend api version is not supported");

        let disk = ClientError::DiskQuery {
            path: PathBuf::from("/missing"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(disk.is_fatal());
        assert!(disk.hash().is_none());
    }
}
