//! Wire payloads returned by the qBittorrent Web API v2.
//!
//! Only the fields the record builder consumes are declared; unknown fields are
//! ignored and missing numeric fields default to zero.

use serde::Deserialize;

use seedwarden_torrent_core::TrackerEntry;

/// Entry of `torrents/info`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TorrentInfo {
    /// Info hash.
    pub hash: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Selected payload size in bytes.
    #[serde(default)]
    pub size: i64,
    /// Backend state string.
    #[serde(default)]
    pub state: String,
    /// Category.
    #[serde(default)]
    pub category: String,
}

/// Body of `torrents/properties`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TorrentProperties {
    /// Save directory.
    #[serde(default)]
    pub save_path: String,
    /// Bytes downloaded across sessions.
    #[serde(default)]
    pub total_downloaded: i64,
    /// Share ratio.
    #[serde(default)]
    pub share_ratio: f64,
    /// Unix timestamp when the torrent was added.
    #[serde(default)]
    pub addition_date: i64,
    /// Seconds spent seeding.
    #[serde(default)]
    pub seeding_time: i64,
    /// Seeds in the swarm.
    #[serde(default)]
    pub seeds_total: i64,
    /// Peers in the swarm.
    #[serde(default)]
    pub peers_total: i64,
}

/// Entry of `torrents/trackers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackerInfo {
    /// Announce URL or pseudo-tracker marker.
    pub url: String,
    /// Last tracker message.
    #[serde(default)]
    pub msg: String,
}

impl From<&TrackerInfo> for TrackerEntry {
    fn from(info: &TrackerInfo) -> Self {
        Self {
            url: info.url.clone(),
            message: info.msg.clone(),
        }
    }
}

/// Entry of `torrents/files`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileInfo {
    /// Path relative to the save directory.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn properties_tolerate_missing_and_extra_fields() {
        let props: TorrentProperties = serde_json::from_value(json!({
            "save_path": "/data/tv",
            "share_ratio": 1.25,
            "addition_date": 1_700_000_000,
            "piece_size": 16384
        }))
        .expect("properties should decode");
        assert_eq!(props.save_path, "/data/tv");
        assert_eq!(props.seeding_time, 0);
        assert!((props.share_ratio - 1.25).abs() < f64::EPSILON);
    }
}
