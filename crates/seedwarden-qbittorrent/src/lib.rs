#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! qBittorrent Web API adapter implementing the seedwarden client contract.
//!
//! Layout: `api.rs` (session-aware HTTP transport), `models.rs` (wire payloads),
//! `client.rs` (`TorrentClient` + `RemovalVerbs` implementation and record
//! building), `error.rs` (transport errors).

mod api;
mod client;
mod error;
pub mod models;

pub use api::QbitApi;
pub use client::{QBITTORRENT_KIND, QbittorrentClient, QbittorrentSettings, build_torrent};
pub use error::{QbitError, QbitResult};
