//! Recording fake implementing the client contract.

use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use seedwarden_torrent_core::{
    ClientError, ClientResult, DiskProbe, FreeSpaceAccountant, RemovalStep, RuleSet, Torrent,
    TorrentClient, TorrentSet,
};

/// Mutating or fetching call observed by a [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    /// `connect`.
    Connect,
    /// `torrents`.
    Torrents,
    /// `remove_torrent`.
    Remove {
        /// Torrent hash.
        hash: String,
        /// Whether data deletion was requested.
        delete_data: bool,
    },
    /// `set_torrent_label`.
    SetLabel {
        /// Torrent hash.
        hash: String,
        /// Requested label.
        label: String,
    },
}

/// Shared handle to the calls a client has recorded.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<ClientCall>>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<ClientCall>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, call: ClientCall) {
        self.lock().push(call);
    }

    /// Every call in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ClientCall> {
        self.lock().clone()
    }

    /// `(hash, delete_data)` for each removal in order.
    #[must_use]
    pub fn removals(&self) -> Vec<(String, bool)> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                ClientCall::Remove { hash, delete_data } => Some((hash.clone(), *delete_data)),
                _ => None,
            })
            .collect()
    }

    /// `(hash, label)` for each label change in order.
    #[must_use]
    pub fn labels(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                ClientCall::SetLabel { hash, label } => Some((hash.clone(), label.clone())),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Failures {
    connect: bool,
    fetch: bool,
    removals: BTreeSet<String>,
    labels: BTreeSet<String>,
}

/// In-memory client that records calls and mutates its own torrent set.
#[derive(Debug)]
pub struct RecordingClient {
    name: String,
    torrents: Mutex<TorrentSet>,
    rules: Arc<RuleSet>,
    space: FreeSpaceAccountant,
    calls: CallLog,
    failures: Failures,
}

impl RecordingClient {
    /// Client with no torrents bound to `rules`.
    #[must_use]
    pub fn new(name: &str, rules: RuleSet) -> Self {
        Self {
            name: name.to_string(),
            torrents: Mutex::new(TorrentSet::new()),
            rules: Arc::new(rules),
            space: FreeSpaceAccountant::new(),
            calls: CallLog::default(),
            failures: Failures::default(),
        }
    }

    /// Add a torrent to the backend.
    #[must_use]
    pub fn with_torrent(self, torrent: Torrent) -> Self {
        self.lock_torrents().insert(torrent.hash.clone(), torrent);
        self
    }

    /// Replace the free space probe.
    #[must_use]
    pub fn with_probe(mut self, probe: impl DiskProbe + 'static) -> Self {
        self.space = FreeSpaceAccountant::with_probe(probe);
        self
    }

    /// Make `connect` fail.
    #[must_use]
    pub const fn failing_connect(mut self) -> Self {
        self.failures.connect = true;
        self
    }

    /// Make `torrents` fail.
    #[must_use]
    pub const fn failing_fetch(mut self) -> Self {
        self.failures.fetch = true;
        self
    }

    /// Make removal of `hash` fail at the reannounce step.
    #[must_use]
    pub fn failing_removal(mut self, hash: &str) -> Self {
        self.failures.removals.insert(hash.to_string());
        self
    }

    /// Make relabeling `hash` fail.
    #[must_use]
    pub fn failing_label(mut self, hash: &str) -> Self {
        self.failures.labels.insert(hash.to_string());
        self
    }

    /// Handle for inspecting calls after the client has been moved.
    #[must_use]
    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }

    /// Torrents still present on the fake backend.
    #[must_use]
    pub fn remaining(&self) -> TorrentSet {
        self.lock_torrents().clone()
    }

    fn lock_torrents(&self) -> MutexGuard<'_, TorrentSet> {
        self.torrents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn scripted(operation: &str) -> Box<io::Error> {
    Box::new(io::Error::other(format!("scripted {operation} failure")))
}

#[async_trait]
impl TorrentClient for RecordingClient {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> ClientResult<()> {
        self.calls.push(ClientCall::Connect);
        if self.failures.connect {
            return Err(ClientError::Connect {
                operation: "login",
                source: scripted("login"),
            });
        }
        Ok(())
    }

    async fn torrents(&self) -> ClientResult<TorrentSet> {
        self.calls.push(ClientCall::Torrents);
        if self.failures.fetch {
            return Err(ClientError::Fetch {
                operation: "torrents_info",
                hash: None,
                source: scripted("fetch"),
            });
        }
        let view = self.free_space_view();
        let mut torrents = self.lock_torrents().clone();
        for torrent in torrents.values_mut() {
            torrent.refresh_free_space(view);
        }
        Ok(torrents)
    }

    async fn remove_torrent(&self, hash: &str, delete_data: bool) -> ClientResult<bool> {
        self.calls.push(ClientCall::Remove {
            hash: hash.to_string(),
            delete_data,
        });
        if self.failures.removals.contains(hash) {
            return Err(ClientError::RemovalStep {
                step: RemovalStep::Reannounce,
                hash: hash.to_string(),
                source: scripted("reannounce"),
            });
        }
        Ok(self.lock_torrents().remove(hash).is_some())
    }

    async fn set_torrent_label(&self, hash: &str, label: &str) -> ClientResult<()> {
        self.calls.push(ClientCall::SetLabel {
            hash: hash.to_string(),
            label: label.to_string(),
        });
        if self.failures.labels.contains(hash) {
            return Err(ClientError::Label {
                hash: hash.to_string(),
                label: label.to_string(),
                source: scripted("label"),
            });
        }
        if let Some(torrent) = self.lock_torrents().get_mut(hash) {
            torrent.label = label.to_string();
        }
        Ok(())
    }

    fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn free_space_accountant(&self) -> &FreeSpaceAccountant {
        &self.space
    }

    fn free_space_accountant_mut(&mut self) -> &mut FreeSpaceAccountant {
        &mut self.space
    }
}
