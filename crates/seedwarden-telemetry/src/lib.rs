#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging primitives shared across the seedwarden workspace.
//!
//! Layout: `init.rs` (subscriber installation and format selection),
//! `context.rs` (run-level span guard), `error.rs` (error type).

pub mod context;
pub mod error;
pub mod init;

pub use context::{RunContextGuard, client_span};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
