#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Command-line driver running `clean` and `relabel` across configured backends.
//!
//! Layout: `cli.rs` (argument parsing), `bootstrap.rs` (logging, config, client
//! construction, task fan-out), `orchestrator.rs` (per-backend run loop),
//! `error.rs` (application errors).

pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod orchestrator;

pub use bootstrap::{ClientTask, build_clients, run_app, run_with, run_tasks};
pub use cli::{Cli, ClientArgs, Command};
pub use error::{AppError, AppResult};
pub use orchestrator::{Mode, RunOptions, RunSummary, run_client};
