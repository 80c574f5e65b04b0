//! Cross-field validation for configuration documents.

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ClientConfig, Config};

fn invalid(section: &str, field: &str, value: Option<&str>, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        section: section.to_string(),
        field: field.to_string(),
        value: value.map(str::to_string),
        reason,
    }
}

/// Validate the whole document.
///
/// # Errors
///
/// Returns the first [`ConfigError`] encountered, checking clients in name order
/// and then filters.
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if config.clients.is_empty() {
        return Err(invalid("clients", "clients", None, "at least one client is required"));
    }

    for (name, client) in &config.clients {
        validate_client(name, client)?;
        if !config.filters.contains_key(&client.filter) {
            return Err(ConfigError::UnknownFilter {
                filter: client.filter.clone(),
            });
        }
    }

    for (name, filter) in &config.filters {
        let section = format!("filters.{name}");
        for label in &filter.label {
            if label.name.trim().is_empty() {
                return Err(invalid(&section, "label.name", None, "must not be empty"));
            }
        }
    }

    Ok(())
}

/// Validate one client entry.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] describing the offending field.
pub fn validate_client(name: &str, client: &ClientConfig) -> ConfigResult<()> {
    let section = format!("clients.{name}");
    if name.trim().is_empty() {
        return Err(invalid("clients", "name", None, "must not be empty"));
    }

    client.client_kind().map_err(|_| {
        invalid(
            &section,
            "type",
            Some(&client.kind),
            "unsupported client type",
        )
    })?;

    let url = Url::parse(client.url.trim())
        .map_err(|_| invalid(&section, "url", Some(&client.url), "must be an absolute url"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            &section,
            "url",
            Some(&client.url),
            "scheme must be http or https",
        ));
    }

    if client.filter.trim().is_empty() {
        return Err(invalid(&section, "filter", None, "must not be empty"));
    }
    if client.timeout_secs == 0 {
        return Err(invalid(
            &section,
            "timeout_secs",
            Some("0"),
            "must be greater than zero",
        ));
    }
    if let Some(path) = &client.free_space_path
        && path.as_os_str().is_empty()
    {
        return Err(invalid(&section, "free_space_path", None, "must not be empty"));
    }

    Ok(())
}
