//! Torrent record fixtures and deterministic disk probes.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use seedwarden_torrent_core::{DiskProbe, Elapsed, GIB, Torrent};

const SECONDS_PER_DAY: f32 = 86_400.0;

/// Builder producing torrent records with derived fields kept consistent.
#[derive(Debug, Clone)]
pub struct TorrentBuilder {
    torrent: Torrent,
    added: Elapsed,
    seeding: Elapsed,
}

impl TorrentBuilder {
    /// Start a seeding torrent with the given hash.
    #[must_use]
    pub fn new(hash: &str) -> Self {
        let mut torrent = Torrent {
            hash: hash.to_string(),
            name: format!("torrent-{hash}"),
            path: "/data".to_string(),
            ..Torrent::default()
        };
        torrent.set_state("uploading");
        Self {
            torrent,
            added: Elapsed::default(),
            seeding: Elapsed::default(),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.torrent.name = name.to_string();
        self
    }

    /// Category.
    #[must_use]
    pub fn label(mut self, label: &str) -> Self {
        self.torrent.label = label.to_string();
        self
    }

    /// Backend state; downloaded/seeding flags follow.
    #[must_use]
    pub fn state(mut self, state: &str) -> Self {
        self.torrent.set_state(state);
        self
    }

    /// Share ratio.
    #[must_use]
    pub const fn ratio(mut self, ratio: f32) -> Self {
        self.torrent.ratio = ratio;
        self
    }

    /// Payload size; downloaded bytes match.
    #[must_use]
    pub const fn total_bytes(mut self, bytes: i64) -> Self {
        self.torrent.total_bytes = bytes;
        self.torrent.downloaded_bytes = bytes;
        self
    }

    /// Payload size in whole GiB.
    #[must_use]
    pub fn size_gib(self, gib: u32) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "GIB is an exact power of two"
        )]
        let bytes = i64::from(gib) * GIB as i64;
        self.total_bytes(bytes)
    }

    /// Content files relative to the save path.
    #[must_use]
    pub fn files(mut self, files: &[&str]) -> Self {
        let root = Path::new(&self.torrent.path);
        self.torrent.files = files
            .iter()
            .map(|file| root.join(file).to_string_lossy().into_owned())
            .collect();
        self
    }

    /// Save path; applies to files added afterwards.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.torrent.path = path.to_string();
        self
    }

    /// First real tracker.
    #[must_use]
    pub fn tracker(mut self, name: &str, status: &str) -> Self {
        self.torrent.tracker_name = name.to_string();
        self.torrent.tracker_status = status.to_string();
        self
    }

    /// Time since the torrent was added.
    #[must_use]
    pub fn added_days(mut self, days: f32) -> Self {
        self.added = elapsed_days(days);
        self
    }

    /// Time spent seeding.
    #[must_use]
    pub fn seeding_days(mut self, days: f32) -> Self {
        self.seeding = elapsed_days(days);
        self
    }

    /// Finish the record.
    #[must_use]
    pub fn build(mut self) -> Torrent {
        self.torrent.set_elapsed(self.added, self.seeding);
        self.torrent
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "fixtures use small day counts"
)]
fn elapsed_days(days: f32) -> Elapsed {
    Elapsed::from_seconds((days * SECONDS_PER_DAY) as i64)
}

/// Disk probe returning a fixed free-byte count and counting queries.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    free: u64,
    calls: Arc<AtomicUsize>,
}

impl FixedProbe {
    /// Probe reporting `free` bytes.
    #[must_use]
    pub fn new(free: u64) -> Self {
        Self {
            free,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Probe reporting whole GiB.
    #[must_use]
    pub fn gib(gib: u64) -> Self {
        Self::new(gib * 1024 * 1024 * 1024)
    }

    /// Number of filesystem queries answered.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DiskProbe for FixedProbe {
    fn free_bytes(&self, _path: &Path) -> io::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_derived_fields_consistent() {
        let torrent = TorrentBuilder::new("abc")
            .label("tv")
            .state("stalledDL")
            .size_gib(2)
            .files(&["Show/ep1.mkv"])
            .seeding_days(2.0)
            .build();
        assert!(!torrent.downloaded);
        assert_eq!(torrent.total_bytes, 2 * 1024 * 1024 * 1024);
        assert_eq!(torrent.files, vec!["/data/Show/ep1.mkv".to_string()]);
        assert_eq!(torrent.seeding_seconds, 172_800);
        assert!((torrent.seeding_days - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn path_and_tracker_shape_the_record() {
        let torrent = TorrentBuilder::new("def")
            .name("Film.2024")
            .path("/mnt/movies")
            .files(&["Film.2024.mkv"])
            .tracker("tracker.example.org", "Unregistered torrent")
            .added_days(1.5)
            .build();
        assert_eq!(torrent.name, "Film.2024");
        assert_eq!(torrent.path, "/mnt/movies");
        assert_eq!(torrent.files, vec!["/mnt/movies/Film.2024.mkv".to_string()]);
        assert_eq!(torrent.tracker_name, "tracker.example.org");
        assert!(torrent.is_unregistered());
        assert_eq!(torrent.added_seconds, 129_600);
        assert!((torrent.added_hours - 36.0).abs() < 1e-3);
    }

    #[test]
    fn fixed_probe_counts_queries() {
        let probe = FixedProbe::gib(3);
        let clone = probe.clone();
        assert_eq!(
            probe.free_bytes(Path::new("/")).expect("fixed"),
            3 * 1024 * 1024 * 1024
        );
        assert_eq!(clone.calls(), 1);
    }
}
