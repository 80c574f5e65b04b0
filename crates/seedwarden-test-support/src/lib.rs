#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shared test helpers used across seedwarden crates.
//! Layout: fixtures.rs (torrent record builders, fixed disk probes), mocks.rs (recording fake client).

pub mod fixtures;
pub mod mocks;

pub use fixtures::{FixedProbe, TorrentBuilder};
pub use mocks::{CallLog, ClientCall, RecordingClient};
