//! Torrent record and derivation helpers shared by every backend adapter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Backend states during which a torrent is still acquiring data.
pub const DOWNLOADING_STATES: &[&str] = &[
    "downloading",
    "stalledDL",
    "queuedDL",
    "pausedDL",
    "stoppedDL",
    "checkingDL",
];

/// Backend states during which a torrent is actively uploading.
pub const SEEDING_STATES: &[&str] = &["uploading", "stalledUP"];

/// Markers qBittorrent embeds in synthetic tracker entries.
pub const PSEUDO_TRACKER_MARKERS: &[&str] = &["[DHT]", "[LSD]", "[PeX]"];

/// Tracker messages signalling the tracker no longer knows the torrent.
const UNREGISTERED_PHRASES: &[&str] = &[
    "unregistered torrent",
    "torrent not registered",
    "torrent is not registered",
    "torrent not found",
    "torrent is not found",
    "infohash not found",
    "torrent has been deleted",
    "torrent has been nuked",
    "trumped",
    "nuked",
    "dupe",
];

/// Torrent records keyed by hash, ordered for deterministic processing.
pub type TorrentSet = BTreeMap<String, Torrent>;

/// Snapshot of one torrent's observable state for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
    /// Info hash; the only key used for mutating operations.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Save directory.
    pub path: String,
    /// Absolute file paths in backend order.
    pub files: Vec<String>,
    /// Total payload size in bytes.
    pub total_bytes: i64,
    /// Bytes downloaded so far.
    pub downloaded_bytes: i64,
    /// Whether the torrent has left every downloading state.
    pub downloaded: bool,
    /// Whether the torrent is in an uploading state.
    pub seeding: bool,
    /// Raw backend status string.
    pub state: String,
    /// Upload/download ratio as reported.
    pub ratio: f32,
    /// Seconds since the torrent was added.
    pub added_seconds: i64,
    /// Hours since the torrent was added.
    pub added_hours: f32,
    /// Days since the torrent was added.
    pub added_days: f32,
    /// Seconds spent seeding.
    pub seeding_seconds: i64,
    /// Hours spent seeding.
    pub seeding_hours: f32,
    /// Days spent seeding.
    pub seeding_days: f32,
    /// Current category.
    pub label: String,
    /// Seeds in the swarm.
    pub seeds: i64,
    /// Peers in the swarm.
    pub peers: i64,
    /// Domain of the first real tracker, empty when none qualify.
    pub tracker_name: String,
    /// Status message of the first real tracker, empty when none qualify.
    pub tracker_status: String,
    /// Free space estimate in GiB at classification time.
    pub free_space_gb: f64,
    /// Whether a free space baseline exists for this run.
    pub free_space_set: bool,
}

impl Torrent {
    /// Overwrite the run-scoped free space fields with the latest estimate.
    pub const fn refresh_free_space(&mut self, view: FreeSpaceView) {
        self.free_space_gb = view.gigabytes;
        self.free_space_set = view.established;
    }

    /// Whether the tracker reports that it no longer knows this torrent.
    #[must_use]
    pub fn is_unregistered(&self) -> bool {
        if self.tracker_status.is_empty() {
            return false;
        }
        let status = self.tracker_status.to_lowercase();
        UNREGISTERED_PHRASES
            .iter()
            .any(|phrase| status.contains(phrase))
    }

    /// Apply added/seeding durations, deriving every unit view from seconds.
    pub const fn set_elapsed(&mut self, added: Elapsed, seeding: Elapsed) {
        self.added_seconds = added.seconds;
        self.added_hours = added.hours;
        self.added_days = added.days;
        self.seeding_seconds = seeding.seconds;
        self.seeding_hours = seeding.hours;
        self.seeding_days = seeding.days;
    }

    /// Apply the derived download/seed flags from a raw backend state.
    pub fn set_state(&mut self, state: impl Into<String>) {
        self.state = state.into();
        self.downloaded = is_downloaded_state(&self.state);
        self.seeding = is_seeding_state(&self.state);
    }
}

/// Free space estimate surfaced into torrent records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FreeSpaceView {
    /// Estimate in GiB.
    pub gigabytes: f64,
    /// Whether a baseline was established this run.
    pub established: bool,
}

/// One duration expressed in seconds, hours, and days.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Elapsed {
    /// Whole seconds.
    pub seconds: i64,
    /// Fractional hours.
    pub hours: f32,
    /// Fractional days.
    pub days: f32,
}

impl Elapsed {
    /// Derive the unit views from a second count.
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        #[expect(
            clippy::cast_precision_loss,
            reason = "hour/day views are approximate by nature"
        )]
        let as_float = seconds as f32;
        Self {
            seconds,
            hours: as_float / 60.0 / 60.0,
            days: as_float / 60.0 / 60.0 / 24.0,
        }
    }
}

/// Whether a backend state means the payload has finished downloading.
#[must_use]
pub fn is_downloaded_state(state: &str) -> bool {
    !DOWNLOADING_STATES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(state))
}

/// Whether a backend state means the torrent is uploading.
#[must_use]
pub fn is_seeding_state(state: &str) -> bool {
    SEEDING_STATES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(state))
}

/// Tracker entry as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerEntry {
    /// Announce URL, or a pseudo-tracker marker string.
    pub url: String,
    /// Last status message reported for the tracker.
    pub message: String,
}

/// Tracker fields exposed on a torrent record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSummary {
    /// Tracker domain.
    pub name: String,
    /// Tracker status message.
    pub status: String,
}

/// Pick the first non-pseudo tracker in backend order.
#[must_use]
pub fn select_tracker(entries: &[TrackerEntry]) -> TrackerSummary {
    entries
        .iter()
        .find(|entry| {
            !PSEUDO_TRACKER_MARKERS
                .iter()
                .any(|marker| entry.url.contains(marker))
        })
        .map(|entry| TrackerSummary {
            name: tracker_domain(&entry.url),
            status: entry.message.clone(),
        })
        .unwrap_or_default()
}

/// Extract the host portion of a tracker announce URL.
#[must_use]
pub fn tracker_domain(raw: &str) -> String {
    if let Ok(parsed) = Url::parse(raw)
        && let Some(host) = parsed.host_str()
    {
        return host.to_string();
    }

    let without_scheme = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    if host.is_empty() {
        raw.to_string()
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(url: &str, message: &str) -> TrackerEntry {
        TrackerEntry {
            url: url.into(),
            message: message.into(),
        }
    }

    #[test]
    fn pseudo_trackers_are_skipped() {
        let summary = select_tracker(&[
            tracker("udp://tracker.example:80[DHT]", "Working"),
            tracker("http://real.tracker/announce", "Unregistered torrent"),
        ]);
        assert_eq!(summary.name, "real.tracker");
        assert_eq!(summary.status, "Unregistered torrent");
    }

    #[test]
    fn no_real_tracker_yields_empty_fields() {
        let summary = select_tracker(&[
            tracker("** [DHT] **", ""),
            tracker("** [PeX] **", ""),
            tracker("** [LSD] **", ""),
        ]);
        assert_eq!(summary, TrackerSummary::default());
        assert!(select_tracker(&[]).name.is_empty());
    }

    #[test]
    fn tracker_domain_handles_unparseable_urls() {
        assert_eq!(tracker_domain("https://t.example.org:443/a/announce"), "t.example.org");
        assert_eq!(tracker_domain("tracker.local:6969/announce"), "tracker.local");
        assert_eq!(tracker_domain("weird"), "weird");
    }

    #[test]
    fn derived_state_flags_follow_backend_state() {
        let mut torrent = Torrent::default();
        torrent.set_state("stalledDL");
        assert!(!torrent.downloaded);
        assert!(!torrent.seeding);

        torrent.set_state("uploading");
        assert!(torrent.downloaded);
        assert!(torrent.seeding);

        torrent.set_state("pausedUP");
        assert!(torrent.downloaded);
        assert!(!torrent.seeding);

        assert!(!is_downloaded_state("DOWNLOADING"));
        assert!(is_seeding_state("StalledUP"));
    }

    #[test]
    fn elapsed_views_share_one_duration() {
        let elapsed = Elapsed::from_seconds(172_800);
        assert_eq!(elapsed.seconds, 172_800);
        assert!((elapsed.hours - 48.0).abs() < f32::EPSILON);
        assert!((elapsed.days - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unregistered_detection_ignores_empty_status() {
        let mut torrent = Torrent::default();
        assert!(!torrent.is_unregistered());
        torrent.tracker_status = "Torrent not registered with this tracker".into();
        assert!(torrent.is_unregistered());
        torrent.tracker_status = "Working".into();
        assert!(!torrent.is_unregistered());
    }

    #[test]
    fn free_space_refresh_overwrites_view() {
        let mut torrent = Torrent::default();
        torrent.refresh_free_space(FreeSpaceView {
            gigabytes: 12.5,
            established: true,
        });
        assert!(torrent.free_space_set);
        assert!((torrent.free_space_gb - 12.5).abs() < f64::EPSILON);
    }
}
