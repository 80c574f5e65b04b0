//! Capability contract implemented by every torrent backend adapter.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ClientError, ClientResult};
use crate::model::{FreeSpaceView, Torrent, TorrentSet};
use crate::policy::PolicyEngine;
use crate::rules::RuleSet;
use crate::space::FreeSpaceAccountant;

/// Backend client consumed by the orchestrator.
///
/// Adapters provide transport-backed operations plus access to their rule set
/// and free space accountant; classification and accounting are shared default
/// methods so every backend evaluates rules identically.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend type name used in logs (for example `qBittorrent`).
    fn kind(&self) -> &'static str;

    /// Configured instance name.
    fn name(&self) -> &str;

    /// Establish a session and verify the backend version.
    async fn connect(&mut self) -> ClientResult<()>;

    /// Fetch every torrent, failing the whole call if any detail lookup fails.
    async fn torrents(&self) -> ClientResult<TorrentSet>;

    /// Run the removal sequence; `true` once the torrent is deleted.
    async fn remove_torrent(&self, hash: &str, delete_data: bool) -> ClientResult<bool>;

    /// Assign a label. Setting the current label again is a no-op.
    async fn set_torrent_label(&self, hash: &str, label: &str) -> ClientResult<()>;

    /// Rule set bound to this client.
    fn rules(&self) -> &RuleSet;

    /// Free space state owned by this client.
    fn free_space_accountant(&self) -> &FreeSpaceAccountant;

    /// Mutable free space state owned by this client.
    fn free_space_accountant_mut(&mut self) -> &mut FreeSpaceAccountant;

    /// Query the filesystem at `path` and reset the free space baseline.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DiskQuery`] when the path cannot be queried.
    fn current_free_space(&mut self, path: &Path) -> ClientResult<u64> {
        self.free_space_accountant_mut().establish(path)
    }

    /// Credit bytes released during this run.
    fn add_free_space(&mut self, bytes: i64) {
        self.free_space_accountant_mut().credit(bytes);
    }

    /// Current free space estimate in GiB.
    fn free_space(&self) -> f64 {
        self.free_space_accountant().gigabytes()
    }

    /// Snapshot of the free space estimate for record refreshes.
    fn free_space_view(&self) -> FreeSpaceView {
        self.free_space_accountant().view()
    }

    /// Whether any ignore rule holds for the torrent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PredicateType`] or [`ClientError::PredicateEval`].
    fn should_ignore(&self, torrent: &Torrent) -> ClientResult<bool> {
        PolicyEngine::new(self.rules())
            .should_ignore(torrent)
            .map_err(|err| ClientError::policy(&torrent.hash, err))
    }

    /// Whether any remove rule holds for the torrent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PredicateType`] or [`ClientError::PredicateEval`].
    fn should_remove(&self, torrent: &Torrent) -> ClientResult<bool> {
        PolicyEngine::new(self.rules())
            .should_remove(torrent)
            .map_err(|err| ClientError::policy(&torrent.hash, err))
    }

    /// Name of the first label rule whose updates all hold.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PredicateType`] or [`ClientError::PredicateEval`].
    fn should_relabel(&self, torrent: &Torrent) -> ClientResult<Option<String>> {
        PolicyEngine::new(self.rules())
            .should_relabel(torrent)
            .map(|label| label.map(str::to_string))
            .map_err(|err| ClientError::policy(&torrent.hash, err))
    }
}
