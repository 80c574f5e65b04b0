#![forbid(unsafe_code)]
#![deny(unused_must_use, missing_docs)]

//! Binary entrypoint for the `seedwarden` command.

use seedwarden_app::{AppResult, run_app};

/// Parses the command line and runs every selected backend to completion.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
