//! Version-gated stop → resume → reannounce → delete sequence.
//!
//! # Design
//! - The backend version is queried at the start of every removal, never cached.
//! - Verb selection lives in [`VerbSet`] so future vocabulary changes stay local.
//! - Settling waits are fixed delays; a failed step aborts in place with no rollback.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use semver::Version;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{BoxError, ClientError, ClientResult};

/// Oldest backend API version the engine accepts.
pub const MINIMUM_API_VERSION: &str = "2.2";

/// First API version using the `stop`/`start` verbs.
pub const VERB_CUTOFF_VERSION: &str = "2.11";

/// Backend API version normalised to three numeric components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion(Version);

impl ApiVersion {
    /// Floor below which connections are refused ([`MINIMUM_API_VERSION`]).
    #[must_use]
    pub const fn minimum() -> Self {
        Self(Version::new(2, 2, 0))
    }

    /// Version at which the verb vocabulary switches ([`VERB_CUTOFF_VERSION`]).
    #[must_use]
    pub const fn verb_cutoff() -> Self {
        Self(Version::new(2, 11, 0))
    }

    /// Whether this version meets the supported floor.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        *self >= Self::minimum()
    }
}

impl FromStr for ApiVersion {
    type Err = semver::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim().trim_start_matches('v');
        let mut parts: Vec<&str> = trimmed.split('.').take(3).collect();
        while parts.len() < 3 {
            parts.push("0");
        }
        Version::parse(&parts.join(".")).map(Self)
    }
}

impl Display for ApiVersion {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}", self.0.major, self.0.minor)?;
        if self.0.patch != 0 {
            write!(formatter, ".{}", self.0.patch)?;
        }
        Ok(())
    }
}

/// Control command sent to the backend for one torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVerb {
    /// Halt transfers (pre-cutoff vocabulary).
    Pause,
    /// Restart transfers (pre-cutoff vocabulary).
    Resume,
    /// Halt transfers (post-cutoff vocabulary).
    Stop,
    /// Restart transfers (post-cutoff vocabulary).
    Start,
}

impl ControlVerb {
    /// Wire name of the verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Start => "start",
        }
    }
}

/// Verb vocabulary matching a backend version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbSet {
    /// `pause` / `resume`.
    Legacy,
    /// `stop` / `start`.
    Current,
}

impl VerbSet {
    /// Select the vocabulary for a measured version.
    #[must_use]
    pub fn for_version(version: &ApiVersion) -> Self {
        if *version < ApiVersion::verb_cutoff() {
            Self::Legacy
        } else {
            Self::Current
        }
    }

    /// Verb that halts transfers.
    #[must_use]
    pub const fn halt(self) -> ControlVerb {
        match self {
            Self::Legacy => ControlVerb::Pause,
            Self::Current => ControlVerb::Stop,
        }
    }

    /// Verb that restarts transfers.
    #[must_use]
    pub const fn restart(self) -> ControlVerb {
        match self {
            Self::Legacy => ControlVerb::Resume,
            Self::Current => ControlVerb::Start,
        }
    }
}

/// Step of the removal sequence that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStep {
    /// Querying or parsing the backend version.
    Version,
    /// Halting transfers.
    Stop,
    /// Restarting transfers.
    Resume,
    /// Re-contacting trackers.
    Reannounce,
    /// Removing the torrent.
    Delete,
}

impl Display for RemovalStep {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Version => "version",
            Self::Stop => "stop",
            Self::Resume => "resume",
            Self::Reannounce => "reannounce",
            Self::Delete => "delete",
        })
    }
}

/// Lifecycle states traversed while removing a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalState {
    /// Halt requested.
    Stopping,
    /// Halt acknowledged.
    Stopped,
    /// Restart requested.
    Resuming,
    /// Restart acknowledged.
    Running,
    /// Reannounce requested.
    Reannouncing,
    /// Reannounce acknowledged.
    Reannounced,
    /// Delete requested.
    Deleting,
    /// Torrent removed.
    Deleted,
}

/// Fixed pauses inserted between removal steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleIntervals {
    /// Wait after halting.
    pub after_stop: Duration,
    /// Wait after restarting.
    pub after_resume: Duration,
    /// Wait after reannouncing.
    pub after_reannounce: Duration,
}

impl Default for SettleIntervals {
    fn default() -> Self {
        Self {
            after_stop: Duration::from_secs(1),
            after_resume: Duration::from_secs(2),
            after_reannounce: Duration::from_secs(2),
        }
    }
}

impl SettleIntervals {
    /// No waiting between steps.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            after_stop: Duration::ZERO,
            after_resume: Duration::ZERO,
            after_reannounce: Duration::ZERO,
        }
    }
}

/// Backend commands the removal sequence drives.
#[async_trait]
pub trait RemovalVerbs: Send + Sync {
    /// Currently deployed API version string.
    async fn api_version(&self) -> Result<String, BoxError>;

    /// Issue a control verb for one torrent.
    async fn control(&self, verb: ControlVerb, hash: &str) -> Result<(), BoxError>;

    /// Ask the backend to re-contact the torrent's trackers.
    async fn reannounce(&self, hash: &str) -> Result<(), BoxError>;

    /// Remove the torrent, optionally deleting its data.
    async fn delete(&self, hash: &str, delete_data: bool) -> Result<(), BoxError>;
}

/// Drives a [`RemovalVerbs`] implementation through the removal protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemovalSequence {
    settle: SettleIntervals,
}

impl RemovalSequence {
    /// Sequence with custom settling intervals.
    #[must_use]
    pub const fn new(settle: SettleIntervals) -> Self {
        Self { settle }
    }

    /// Run the full sequence for one torrent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RemovalStep`] naming the step that failed. The torrent is
    /// left in whatever state that step produced.
    pub async fn run<V>(&self, verbs: &V, hash: &str, delete_data: bool) -> ClientResult<bool>
    where
        V: RemovalVerbs + ?Sized,
    {
        let step_failed = |step: RemovalStep| {
            let hash = hash.to_string();
            move |source: BoxError| ClientError::RemovalStep { step, hash, source }
        };

        let reported = verbs
            .api_version()
            .await
            .map_err(step_failed(RemovalStep::Version))?;
        let version: ApiVersion = reported
            .parse()
            .map_err(|err: semver::Error| step_failed(RemovalStep::Version)(Box::new(err) as BoxError))?;
        let verb_set = VerbSet::for_version(&version);
        debug!(hash, version = %version, verbs = ?verb_set, "selected removal verbs");

        let mut state = RemovalState::Stopping;
        trace_state(hash, state);
        verbs
            .control(verb_set.halt(), hash)
            .await
            .map_err(step_failed(RemovalStep::Stop))?;
        state = RemovalState::Stopped;
        trace_state(hash, state);
        sleep(self.settle.after_stop).await;

        state = RemovalState::Resuming;
        trace_state(hash, state);
        verbs
            .control(verb_set.restart(), hash)
            .await
            .map_err(step_failed(RemovalStep::Resume))?;
        state = RemovalState::Running;
        trace_state(hash, state);
        sleep(self.settle.after_resume).await;

        state = RemovalState::Reannouncing;
        trace_state(hash, state);
        verbs
            .reannounce(hash)
            .await
            .map_err(step_failed(RemovalStep::Reannounce))?;
        state = RemovalState::Reannounced;
        trace_state(hash, state);
        sleep(self.settle.after_reannounce).await;

        state = RemovalState::Deleting;
        trace_state(hash, state);
        verbs
            .delete(hash, delete_data)
            .await
            .map_err(step_failed(RemovalStep::Delete))?;
        state = RemovalState::Deleted;
        trace_state(hash, state);

        Ok(state == RemovalState::Deleted)
    }
}

fn trace_state(hash: &str, state: RemovalState) {
    debug!(hash, state = ?state, "removal state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Version,
        Control(ControlVerb),
        Reannounce,
        Delete(bool),
    }

    struct ScriptedBackend {
        version: String,
        fail_on: Option<RemovalStep>,
        calls: Mutex<Vec<(Call, Instant)>>,
    }

    impl ScriptedBackend {
        fn new(version: &str) -> Self {
            Self {
                version: version.to_string(),
                fail_on: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(version: &str, step: RemovalStep) -> Self {
            Self {
                fail_on: Some(step),
                ..Self::new(version)
            }
        }

        fn record(&self, call: Call, step: RemovalStep) -> Result<(), BoxError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((call, Instant::now()));
            if self.fail_on == Some(step) {
                return Err(Box::new(io::Error::other("scripted failure")));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<Call> {
            self.calls
                .lock()
                .expect("calls lock")
                .iter()
                .map(|(call, _)| call.clone())
                .collect()
        }

        fn instants(&self) -> Vec<Instant> {
            self.calls
                .lock()
                .expect("calls lock")
                .iter()
                .map(|(_, at)| *at)
                .collect()
        }
    }

    #[async_trait]
    impl RemovalVerbs for ScriptedBackend {
        async fn api_version(&self) -> Result<String, BoxError> {
            self.record(Call::Version, RemovalStep::Version)?;
            Ok(self.version.clone())
        }

        async fn control(&self, verb: ControlVerb, _hash: &str) -> Result<(), BoxError> {
            let step = match verb {
                ControlVerb::Pause | ControlVerb::Stop => RemovalStep::Stop,
                ControlVerb::Resume | ControlVerb::Start => RemovalStep::Resume,
            };
            self.record(Call::Control(verb), step)
        }

        async fn reannounce(&self, _hash: &str) -> Result<(), BoxError> {
            self.record(Call::Reannounce, RemovalStep::Reannounce)
        }

        async fn delete(&self, _hash: &str, delete_data: bool) -> Result<(), BoxError> {
            self.record(Call::Delete(delete_data), RemovalStep::Delete)
        }
    }

    #[test]
    fn version_bounds_match_published_constants() {
        assert_eq!(ApiVersion::minimum().to_string(), MINIMUM_API_VERSION);
        assert_eq!(ApiVersion::verb_cutoff().to_string(), VERB_CUTOFF_VERSION);
        assert_eq!(
            MINIMUM_API_VERSION.parse::<ApiVersion>().expect("floor parses"),
            ApiVersion::minimum()
        );
    }

    #[test]
    fn versions_compare_numerically() {
        let old: ApiVersion = "2.10".parse().expect("parse");
        let cutoff: ApiVersion = "2.11".parse().expect("parse");
        let new: ApiVersion = "2.12.1".parse().expect("parse");
        assert!(old < cutoff);
        assert!(new > cutoff);
        assert_eq!(VerbSet::for_version(&old), VerbSet::Legacy);
        assert_eq!(VerbSet::for_version(&cutoff), VerbSet::Current);
        assert_eq!(VerbSet::for_version(&new), VerbSet::Current);
        assert!(!"2.1".parse::<ApiVersion>().expect("parse").is_supported());
        assert!("2.2".parse::<ApiVersion>().expect("parse").is_supported());
        assert!("garbage".parse::<ApiVersion>().is_err());
        assert_eq!(old.to_string(), "2.10");
        assert_eq!(new.to_string(), "2.12.1");
    }

    #[tokio::test(start_paused = true)]
    async fn legacy_backend_uses_pause_and_resume() {
        let backend = ScriptedBackend::new("2.10");
        let removed = RemovalSequence::default()
            .run(&backend, "abc", true)
            .await
            .expect("removal should succeed");
        assert!(removed);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Version,
                Call::Control(ControlVerb::Pause),
                Call::Control(ControlVerb::Resume),
                Call::Reannounce,
                Call::Delete(true),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn current_backend_uses_stop_and_start_after_waits() {
        let backend = ScriptedBackend::new("2.12");
        RemovalSequence::default()
            .run(&backend, "abc", false)
            .await
            .expect("removal should succeed");
        assert_eq!(
            backend.calls(),
            vec![
                Call::Version,
                Call::Control(ControlVerb::Stop),
                Call::Control(ControlVerb::Start),
                Call::Reannounce,
                Call::Delete(false),
            ]
        );

        let at = backend.instants();
        assert_eq!(at[2] - at[1], Duration::from_secs(1));
        assert_eq!(at[3] - at[2], Duration::from_secs(2));
        assert_eq!(at[4] - at[3], Duration::from_secs(2));
    }

    #[tokio::test]
    async fn failed_step_aborts_without_rollback() {
        let backend = ScriptedBackend::failing("2.11", RemovalStep::Reannounce);
        let err = RemovalSequence::new(SettleIntervals::immediate())
            .run(&backend, "abc", true)
            .await
            .expect_err("reannounce failure should abort");
        assert!(matches!(
            &err,
            ClientError::RemovalStep { step: RemovalStep::Reannounce, hash, .. } if hash == "abc"
        ));
        assert_eq!(
            backend.calls(),
            vec![
                Call::Version,
                Call::Control(ControlVerb::Stop),
                Call::Control(ControlVerb::Start),
                Call::Reannounce,
            ]
        );
    }

    #[tokio::test]
    async fn unparseable_version_fails_version_step() {
        let backend = ScriptedBackend::new("not-a-version");
        let err = RemovalSequence::new(SettleIntervals::immediate())
            .run(&backend, "abc", true)
            .await
            .expect_err("version parse should fail");
        assert!(matches!(
            err,
            ClientError::RemovalStep { step: RemovalStep::Version, .. }
        ));
        assert_eq!(backend.calls(), vec![Call::Version]);
    }
}
