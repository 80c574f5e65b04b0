//! Per-backend run loop for `clean` and `relabel`.
//!
//! # Design
//! - One backend is processed sequentially: connect, fetch, classify, act.
//! - Torrents are visited in hash order; free space is refreshed into each record
//!   right before it is classified so earlier deletions are visible.
//! - Per-torrent failures are logged and counted; connect/fetch failures end
//!   the run for that backend.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use seedwarden_torrent_core::{ClientResult, Torrent, TorrentClient, TorrentSet};
use tracing::{debug, info, warn};

/// Which command a backend run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Remove matching torrents.
    Clean,
    /// Apply label rules.
    Relabel,
}

impl Mode {
    /// Command name used in logs and the run span.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Relabel => "relabel",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Options applied to one backend run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log decisions without mutating the backend.
    pub dry_run: bool,
    /// Filesystem path used to establish the free space baseline.
    pub free_space_path: Option<PathBuf>,
}

/// Outcome counters for one backend run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Torrents skipped by the ignore rules.
    pub ignored: usize,
    /// Torrents removed (or that would be removed in a dry run).
    pub removed: usize,
    /// Torrents relabeled (or that would be relabeled in a dry run).
    pub relabeled: usize,
    /// Torrents whose classification or action failed.
    pub failed: usize,
    /// Payload bytes released by removals that deleted data.
    pub freed_bytes: i64,
}

impl RunSummary {
    /// Add another run's counters to this one.
    pub const fn absorb(&mut self, other: Self) {
        self.ignored += other.ignored;
        self.removed += other.removed;
        self.relabeled += other.relabeled;
        self.failed += other.failed;
        self.freed_bytes += other.freed_bytes;
    }
}

/// Run `mode` against one backend.
///
/// # Errors
///
/// Returns the backend-fatal [`seedwarden_torrent_core::ClientError`] when
/// connecting, establishing the free space baseline, or fetching fails.
/// Per-torrent failures are counted in the summary instead.
pub async fn run_client<C>(
    client: &mut C,
    mode: Mode,
    options: &RunOptions,
) -> ClientResult<RunSummary>
where
    C: TorrentClient + ?Sized,
{
    client.connect().await?;
    let summary = match mode {
        Mode::Clean => clean(client, options).await?,
        Mode::Relabel => relabel(client, options).await?,
    };
    info!(
        mode = %mode,
        dry_run = options.dry_run,
        ignored = summary.ignored,
        removed = summary.removed,
        relabeled = summary.relabeled,
        failed = summary.failed,
        freed_bytes = summary.freed_bytes,
        "backend run finished"
    );
    Ok(summary)
}

enum CleanDecision {
    Ignore,
    Remove,
    Keep,
}

fn classify_clean<C>(client: &C, torrent: &Torrent) -> ClientResult<CleanDecision>
where
    C: TorrentClient + ?Sized,
{
    if client.should_ignore(torrent)? {
        return Ok(CleanDecision::Ignore);
    }
    if client.should_remove(torrent)? {
        return Ok(CleanDecision::Remove);
    }
    Ok(CleanDecision::Keep)
}

async fn clean<C>(client: &mut C, options: &RunOptions) -> ClientResult<RunSummary>
where
    C: TorrentClient + ?Sized,
{
    if let Some(path) = &options.free_space_path {
        client.current_free_space(path)?;
    }

    let mut remaining = client.torrents().await?;
    let hashes: Vec<String> = remaining.keys().cloned().collect();
    let mut summary = RunSummary::default();

    for hash in hashes {
        let Some(mut torrent) = remaining.get(&hash).cloned() else {
            continue;
        };
        torrent.refresh_free_space(client.free_space_view());

        let decision = match classify_clean(client, &torrent) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(hash = %torrent.hash, name = %torrent.name, error = %err, "classification failed");
                summary.failed += 1;
                continue;
            }
        };

        match decision {
            CleanDecision::Ignore => {
                debug!(hash = %torrent.hash, name = %torrent.name, "torrent ignored");
                summary.ignored += 1;
            }
            CleanDecision::Keep => {
                debug!(hash = %torrent.hash, name = %torrent.name, "torrent kept");
            }
            CleanDecision::Remove => {
                remaining.remove(&hash);
                let delete_data = !shares_files(&torrent, &remaining);
                info!(
                    hash = %torrent.hash,
                    name = %torrent.name,
                    label = %torrent.label,
                    delete_data,
                    dry_run = options.dry_run,
                    "removing torrent"
                );
                if options.dry_run {
                    summary.removed += 1;
                    continue;
                }
                match client.remove_torrent(&hash, delete_data).await {
                    Ok(true) => {
                        summary.removed += 1;
                        if delete_data {
                            client.add_free_space(torrent.total_bytes);
                            summary.freed_bytes += torrent.total_bytes;
                        }
                    }
                    Ok(false) => {
                        debug!(hash = %torrent.hash, "torrent was already gone");
                    }
                    Err(err) => {
                        warn!(hash = %torrent.hash, name = %torrent.name, error = %err, "removal failed");
                        summary.failed += 1;
                        remaining.insert(hash, torrent);
                    }
                }
            }
        }
    }

    Ok(summary)
}

/// Whether any torrent still on the backend references one of `torrent`'s files.
fn shares_files(torrent: &Torrent, others: &TorrentSet) -> bool {
    if torrent.files.is_empty() {
        return false;
    }
    let files: BTreeSet<&str> = torrent.files.iter().map(String::as_str).collect();
    others
        .values()
        .filter(|other| other.hash != torrent.hash)
        .any(|other| other.files.iter().any(|file| files.contains(file.as_str())))
}

async fn relabel<C>(client: &mut C, options: &RunOptions) -> ClientResult<RunSummary>
where
    C: TorrentClient + ?Sized,
{
    let torrents = client.torrents().await?;
    let mut summary = RunSummary::default();

    for mut torrent in torrents.into_values() {
        torrent.refresh_free_space(client.free_space_view());

        let target = match client.should_ignore(&torrent) {
            Ok(true) => {
                summary.ignored += 1;
                continue;
            }
            Ok(false) => client.should_relabel(&torrent),
            Err(err) => Err(err),
        };
        let label = match target {
            Ok(Some(label)) if label != torrent.label => label,
            Ok(_) => continue,
            Err(err) => {
                warn!(hash = %torrent.hash, name = %torrent.name, error = %err, "classification failed");
                summary.failed += 1;
                continue;
            }
        };

        info!(
            hash = %torrent.hash,
            name = %torrent.name,
            from = %torrent.label,
            to = %label,
            dry_run = options.dry_run,
            "relabeling torrent"
        );
        if options.dry_run {
            summary.relabeled += 1;
            continue;
        }
        match client.set_torrent_label(&torrent.hash, &label).await {
            Ok(()) => summary.relabeled += 1,
            Err(err) => {
                warn!(hash = %torrent.hash, label = %label, error = %err, "relabel failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
