#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! YAML configuration for seedwarden clients and filters.
//!
//! Layout: `model.rs` (typed documents and rule set construction), `loader.rs`
//! (file loading and path resolution), `validate.rs` (cross-field checks),
//! `error.rs` (error taxonomy).

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH, load_config, resolve_config_path};
pub use model::{
    ClientConfig, ClientKind, Config, DEFAULT_TIMEOUT_SECS, FilterConfig, LabelConfig,
};
