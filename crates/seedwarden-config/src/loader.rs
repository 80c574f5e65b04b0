//! Configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Config;

/// Path used when neither the flag nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Environment variable consulted for the configuration path.
pub const CONFIG_ENV_VAR: &str = "SEEDWARDEN_CONFIG";

/// Pick the configuration path from an explicit override or the default.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf)
}

/// Read, parse, and validate the configuration at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read, otherwise any
/// parse or validation error.
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "read_config",
        path: path.to_path_buf(),
        source,
    })?;
    let config = Config::from_yaml_str(&raw)?;
    debug!(
        path = %path.display(),
        clients = config.clients.len(),
        filters = config.filters.len(),
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_applies_without_override() {
        assert_eq!(resolve_config_path(None), PathBuf::from("config.yaml"));
        assert_eq!(
            resolve_config_path(Some(Path::new("/etc/seedwarden.yaml"))),
            PathBuf::from("/etc/seedwarden.yaml")
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config(&dir.path().join("absent.yaml")).expect_err("file is missing");
        assert!(matches!(err, ConfigError::Io { operation: "read_config", .. }));
    }
}
