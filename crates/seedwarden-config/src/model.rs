//! Typed configuration documents.
//!
//! # Design
//! - Expressions are written as single-key maps (`eq: [a, b]`) and read into
//!   [`Expr`] trees through `singleton_map_recursive`; invalid regex patterns
//!   fail at parse time.
//! - Rule sets are built on demand and shared behind `Arc`.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::with::singleton_map_recursive;

use seedwarden_torrent_core::{Expr, LabelRule, RuleSet};

use crate::error::{ConfigError, ConfigResult};
use crate::validate;

/// Request timeout applied when a client does not set `timeout_secs`.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_enabled() -> bool {
    true
}

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Backend clients keyed by name.
    #[serde(default)]
    pub clients: BTreeMap<String, ClientConfig>,
    /// Filters keyed by name.
    #[serde(default)]
    pub filters: BTreeMap<String, FilterConfig>,
}

/// Supported backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// qBittorrent Web API.
    Qbittorrent,
}

impl FromStr for ClientKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case("qbittorrent") {
            Ok(Self::Qbittorrent)
        } else {
            Err(ConfigError::InvalidField {
                section: "clients".to_string(),
                field: "type".to_string(),
                value: Some(raw.to_string()),
                reason: "unsupported client type",
            })
        }
    }
}

impl Display for ClientKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qbittorrent => formatter.write_str("qbittorrent"),
        }
    }
}

/// Connection and policy settings for one backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Backend type (`qbittorrent`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Web UI base URL.
    pub url: String,
    /// Login user.
    #[serde(default)]
    pub user: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
    /// Name of the filter applied to this client.
    pub filter: String,
    /// Path whose filesystem is measured for free space.
    #[serde(default)]
    pub free_space_path: Option<PathBuf>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Whether the client runs when no names are given.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ClientConfig {
    /// Parsed backend type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for an unsupported type.
    pub fn client_kind(&self) -> ConfigResult<ClientKind> {
        self.kind.parse()
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ignore, remove, and label expressions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Any match skips the torrent.
    #[serde(default, deserialize_with = "singleton_map_recursive::deserialize")]
    pub ignore: Vec<Expr>,
    /// Any match removes the torrent.
    #[serde(default, deserialize_with = "singleton_map_recursive::deserialize")]
    pub remove: Vec<Expr>,
    /// Ordered relabel rules.
    #[serde(default)]
    pub label: Vec<LabelConfig>,
}

impl FilterConfig {
    /// Build an immutable rule set from the expressions.
    #[must_use]
    pub fn to_rule_set(&self) -> RuleSet {
        let mut rules = RuleSet::new();
        for expr in &self.ignore {
            rules = rules.with_ignore(expr.clone());
        }
        for expr in &self.remove {
            rules = rules.with_remove(expr.clone());
        }
        for label in &self.label {
            let rule = label
                .update
                .iter()
                .fold(LabelRule::new(label.name.clone()), |rule, expr| {
                    rule.with_update(expr.clone())
                });
            rules = rules.with_label(rule);
        }
        rules
    }
}

/// One relabel rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelConfig {
    /// Label to apply.
    pub name: String,
    /// Expressions that must all hold.
    #[serde(default, deserialize_with = "singleton_map_recursive::deserialize")]
    pub update: Vec<Expr>,
}

impl Config {
    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and validation
    /// errors for inconsistent ones.
    pub fn from_yaml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate_config(self)
    }

    /// Rule set for the named filter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFilter`] when the filter is not defined.
    pub fn rule_set(&self, filter: &str) -> ConfigResult<Arc<RuleSet>> {
        self.filters
            .get(filter)
            .map(|config| Arc::new(config.to_rule_set()))
            .ok_or_else(|| ConfigError::UnknownFilter {
                filter: filter.to_string(),
            })
    }

    /// Clients to run: the named ones, or every enabled client when `names` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownClient`] for a name that is not configured.
    pub fn select_clients<'a>(
        &'a self,
        names: &[String],
    ) -> ConfigResult<Vec<(&'a str, &'a ClientConfig)>> {
        if names.is_empty() {
            return Ok(self
                .clients
                .iter()
                .filter(|(_, client)| client.enabled)
                .map(|(name, client)| (name.as_str(), client))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                self.clients
                    .get_key_value(name)
                    .map(|(key, client)| (key.as_str(), client))
                    .ok_or_else(|| ConfigError::UnknownClient {
                        client: name.clone(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwarden_torrent_core::{PolicyEngine, Torrent};

    const SAMPLE: &str = r#"
clients:
  main:
    type: qbittorrent
    url: http://localhost:8080
    user: admin
    password: secret
    filter: default
  spare:
    type: qbittorrent
    url: http://localhost:9090/
    filter: default
    enabled: false
    timeout_secs: 5
filters:
  default:
    ignore:
      - eq: [{ field: label }, { value: keep }]
    remove:
      - and:
          - field: downloaded
          - gt: [{ field: ratio }, { value: 2.0 }]
    label:
      - name: long-term
        update:
          - eq: [{ field: label }, { value: tv }]
          - gt: [{ field: seeding_days }, { value: 30 }]
"#;

    #[test]
    fn defaults_apply_to_optional_fields() {
        let config = Config::from_yaml_str(SAMPLE).expect("sample parses");
        let main = &config.clients["main"];
        assert_eq!(main.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(main.enabled);
        assert!(main.free_space_path.is_none());
        assert_eq!(main.client_kind().expect("kind"), ClientKind::Qbittorrent);
        assert_eq!(config.clients["spare"].timeout_secs, 5);
    }

    #[test]
    fn select_clients_defaults_to_enabled() {
        let config = Config::from_yaml_str(SAMPLE).expect("sample parses");
        let names: Vec<&str> = config
            .select_clients(&[])
            .expect("select")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["main"]);

        let explicit = config
            .select_clients(&["spare".to_string()])
            .expect("select");
        assert_eq!(explicit[0].0, "spare");

        assert!(matches!(
            config.select_clients(&["ghost".to_string()]),
            Err(ConfigError::UnknownClient { client }) if client == "ghost"
        ));
    }

    #[test]
    fn rule_set_reflects_filter_order() {
        let config = Config::from_yaml_str(SAMPLE).expect("sample parses");
        let rules = config.rule_set("default").expect("filter exists");
        assert_eq!(rules.ignores.len(), 1);
        assert_eq!(rules.removes.len(), 1);
        assert_eq!(rules.labels[0].name, "long-term");
        assert_eq!(rules.labels[0].updates.len(), 2);

        let mut torrent = Torrent {
            hash: "abc".into(),
            label: "tv".into(),
            ratio: 3.0,
            seeding_days: 45.0,
            ..Torrent::default()
        };
        torrent.set_state("uploading");
        let engine = PolicyEngine::new(&rules);
        assert!(!engine.should_ignore(&torrent).expect("ignore"));
        assert!(engine.should_remove(&torrent).expect("remove"));
        assert_eq!(
            engine.should_relabel(&torrent).expect("relabel"),
            Some("long-term")
        );

        assert!(matches!(
            config.rule_set("missing"),
            Err(ConfigError::UnknownFilter { filter }) if filter == "missing"
        ));
    }

    #[test]
    fn invalid_regex_is_a_parse_error() {
        let raw = r#"
clients:
  main: { type: qbittorrent, url: "http://h", filter: f }
filters:
  f:
    remove:
      - matches: [{ field: name }, "(unclosed"]
"#;
        let Err(ConfigError::Parse { source }) = Config::from_yaml_str(raw) else {
            panic!("invalid pattern should fail to parse");
        };
        assert!(
            source.to_string().contains("regex parse error"),
            "unexpected parse error: {source}"
        );

        let valid = raw.replace("(unclosed", "(?i)^show");
        let config = Config::from_yaml_str(&valid).expect("valid pattern parses");
        assert_eq!(config.rule_set("f").expect("filter").removes.len(), 1);
    }
}
