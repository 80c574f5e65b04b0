//! `TorrentClient` implementation backed by qBittorrent.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use seedwarden_torrent_core::{
    ApiVersion, BoxError, ClientError, ClientResult, ControlVerb, Elapsed, FreeSpaceAccountant,
    MINIMUM_API_VERSION, RemovalSequence, RemovalVerbs, RuleSet, Torrent, TorrentClient,
    TorrentSet, TrackerEntry, select_tracker,
};

use crate::api::QbitApi;
use crate::error::{QbitError, QbitResult};
use crate::models::{FileInfo, TorrentInfo, TorrentProperties, TrackerInfo};

/// Backend type name reported in logs.
pub const QBITTORRENT_KIND: &str = "qBittorrent";

/// Connection settings for one qBittorrent instance.
#[derive(Debug, Clone)]
pub struct QbittorrentSettings {
    /// Instance name from configuration.
    pub name: String,
    /// Web UI base URL.
    pub url: String,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// qBittorrent client owning its rule set and free space state.
#[derive(Debug)]
pub struct QbittorrentClient {
    name: String,
    user: String,
    password: String,
    api: QbitApi,
    rules: Arc<RuleSet>,
    space: FreeSpaceAccountant,
    removal: RemovalSequence,
}

impl QbittorrentClient {
    /// Build an unconnected client.
    ///
    /// # Errors
    ///
    /// Returns a [`QbitError`] when the transport cannot be constructed.
    pub fn new(settings: QbittorrentSettings, rules: Arc<RuleSet>) -> QbitResult<Self> {
        let api = QbitApi::new(&settings.url, settings.timeout)?;
        Ok(Self {
            name: settings.name,
            user: settings.user,
            password: settings.password,
            api,
            rules,
            space: FreeSpaceAccountant::new(),
            removal: RemovalSequence::default(),
        })
    }

    /// Replace the removal sequence (for example to shorten settling waits).
    #[must_use]
    pub const fn with_removal_sequence(mut self, removal: RemovalSequence) -> Self {
        self.removal = removal;
        self
    }

    async fn fetch_record(&self, info: &TorrentInfo, now: i64) -> ClientResult<Torrent> {
        let failed = |operation: &'static str| {
            let hash = info.hash.clone();
            move |err: QbitError| ClientError::Fetch {
                operation,
                hash: Some(hash),
                source: Box::new(err),
            }
        };

        let properties = self
            .api
            .properties(&info.hash)
            .await
            .map_err(failed("torrent_properties"))?;
        let trackers = self
            .api
            .trackers(&info.hash)
            .await
            .map_err(failed("torrent_trackers"))?;
        let files = self
            .api
            .files(&info.hash)
            .await
            .map_err(failed("torrent_files"))?;

        Ok(build_torrent(info, &properties, &trackers, &files, now))
    }
}

/// Build a torrent record from qBittorrent payloads observed at `now` (unix seconds).
#[must_use]
pub fn build_torrent(
    info: &TorrentInfo,
    properties: &TorrentProperties,
    trackers: &[TrackerInfo],
    files: &[FileInfo],
    now: i64,
) -> Torrent {
    let entries: Vec<TrackerEntry> = trackers.iter().map(TrackerEntry::from).collect();
    let tracker = select_tracker(&entries);
    let save_path = Path::new(&properties.save_path);

    #[expect(
        clippy::cast_possible_truncation,
        reason = "ratio is exposed as single precision"
    )]
    let ratio = properties.share_ratio as f32;

    let mut torrent = Torrent {
        hash: info.hash.clone(),
        name: info.name.clone(),
        path: properties.save_path.clone(),
        files: files
            .iter()
            .map(|file| save_path.join(&file.name).to_string_lossy().into_owned())
            .collect(),
        total_bytes: info.size,
        downloaded_bytes: properties.total_downloaded,
        ratio,
        label: info.category.clone(),
        seeds: properties.seeds_total,
        peers: properties.peers_total,
        tracker_name: tracker.name,
        tracker_status: tracker.status,
        ..Torrent::default()
    };
    torrent.set_state(info.state.as_str());
    torrent.set_elapsed(
        Elapsed::from_seconds((now - properties.addition_date).max(0)),
        Elapsed::from_seconds(properties.seeding_time.max(0)),
    );
    torrent
}

#[async_trait]
impl TorrentClient for QbittorrentClient {
    fn kind(&self) -> &'static str {
        QBITTORRENT_KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> ClientResult<()> {
        self.api
            .login(&self.user, &self.password)
            .await
            .map_err(|err| ClientError::Connect {
                operation: "login",
                source: Box::new(err),
            })?;

        let reported = self
            .api
            .api_version()
            .await
            .map_err(|err| ClientError::Connect {
                operation: "api_version",
                source: Box::new(err),
            })?;
        debug!(client = %self.name, version = %reported, "qBittorrent api version");

        let version = reported
            .parse::<ApiVersion>()
            .map_err(|err| ClientError::Connect {
                operation: "parse_api_version",
                source: Box::new(err),
            })?;
        if !version.is_supported() {
            return Err(ClientError::UnsupportedVersion {
                reported,
                minimum: MINIMUM_API_VERSION,
            });
        }
        Ok(())
    }

    async fn torrents(&self) -> ClientResult<TorrentSet> {
        let listing = self
            .api
            .torrents_info()
            .await
            .map_err(|err| ClientError::Fetch {
                operation: "torrents_info",
                hash: None,
                source: Box::new(err),
            })?;
        debug!(client = %self.name, count = listing.len(), "retrieved torrent list");

        let now = Utc::now().timestamp();
        let view = self.free_space_view();
        let mut torrents = TorrentSet::new();
        for info in &listing {
            let mut torrent = self.fetch_record(info, now).await?;
            torrent.refresh_free_space(view);
            torrents.insert(torrent.hash.clone(), torrent);
        }
        Ok(torrents)
    }

    async fn remove_torrent(&self, hash: &str, delete_data: bool) -> ClientResult<bool> {
        self.removal.run(self, hash, delete_data).await
    }

    async fn set_torrent_label(&self, hash: &str, label: &str) -> ClientResult<()> {
        self.api
            .set_category(hash, label)
            .await
            .map_err(|err| ClientError::Label {
                hash: hash.to_string(),
                label: label.to_string(),
                source: Box::new(err),
            })
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

#[async_trait]
impl RemovalVerbs for QbittorrentClient {
    async fn api_version(&self) -> Result<String, BoxError> {
        Ok(self.api.api_version().await?)
    }

    async fn control(&self, verb: ControlVerb, hash: &str) -> Result<(), BoxError> {
        Ok(self.api.control(verb, hash).await?)
    }

    async fn reannounce(&self, hash: &str) -> Result<(), BoxError> {
        Ok(self.api.reannounce(hash).await?)
    }

    async fn delete(&self, hash: &str, delete_data: bool) -> Result<(), BoxError> {
        Ok(self.api.delete(hash, delete_data).await?)
    }
}
