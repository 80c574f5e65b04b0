//! Free space accounting for one client over one run.
//!
//! # Design
//! - The filesystem is queried once to establish a baseline.
//! - Later deletions are credited additively; other disk consumers are not observed.
//! - The probe is a trait so the query can be substituted in tests.

use std::fmt::Debug;
use std::io;
use std::path::Path;

use nix::sys::statvfs::statvfs;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::model::FreeSpaceView;

/// Bytes per GiB.
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Source of free-byte measurements for a filesystem path.
pub trait DiskProbe: Send + Sync + Debug {
    /// Free bytes available to unprivileged users at `path`.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the path cannot be queried.
    fn free_bytes(&self, path: &Path) -> io::Result<u64>;
}

/// Probe backed by `statvfs(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsProbe;

impl DiskProbe for StatvfsProbe {
    fn free_bytes(&self, path: &Path) -> io::Result<u64> {
        let stats = statvfs(path).map_err(io::Error::from)?;
        #[allow(clippy::useless_conversion)]
        let free = u64::from(stats.blocks_available()) * u64::from(stats.fragment_size());
        Ok(free)
    }
}

/// Running free space estimate owned by one client instance.
#[derive(Debug)]
pub struct FreeSpaceAccountant {
    gigabytes: f64,
    established: bool,
    probe: Box<dyn DiskProbe>,
}

impl Default for FreeSpaceAccountant {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeSpaceAccountant {
    /// Accountant using the `statvfs` probe.
    #[must_use]
    pub fn new() -> Self {
        Self::with_probe(StatvfsProbe)
    }

    /// Accountant using a caller-supplied probe.
    #[must_use]
    pub fn with_probe(probe: impl DiskProbe + 'static) -> Self {
        Self {
            gigabytes: 0.0,
            established: false,
            probe: Box::new(probe),
        }
    }

    /// Query the filesystem and reset the estimate to the measured value.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DiskQuery`] when the path is inaccessible.
    pub fn establish(&mut self, path: &Path) -> ClientResult<u64> {
        let free = self
            .probe
            .free_bytes(path)
            .map_err(|source| ClientError::DiskQuery {
                path: path.to_path_buf(),
                source,
            })?;
        self.gigabytes = bytes_to_gib(free);
        self.established = true;
        debug!(path = %path.display(), free_gb = self.gigabytes, "free space baseline established");
        Ok(free)
    }

    /// Credit bytes released by a deletion made during this run.
    pub fn credit(&mut self, bytes: i64) {
        #[expect(
            clippy::cast_precision_loss,
            reason = "free space is tracked as an approximate GiB figure"
        )]
        let delta = bytes as f64 / GIB;
        self.gigabytes += delta;
    }

    /// Current estimate in GiB.
    #[must_use]
    pub const fn gigabytes(&self) -> f64 {
        self.gigabytes
    }

    /// Whether a baseline has been established.
    #[must_use]
    pub const fn is_established(&self) -> bool {
        self.established
    }

    /// Snapshot for surfacing into torrent records.
    #[must_use]
    pub const fn view(&self) -> FreeSpaceView {
        FreeSpaceView {
            gigabytes: self.gigabytes,
            established: self.established,
        }
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "free space is tracked as an approximate GiB figure"
)]
fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}
