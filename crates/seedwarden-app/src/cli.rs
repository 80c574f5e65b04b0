//! Command-line surface for the `seedwarden` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use seedwarden_config::CONFIG_ENV_VAR;
use seedwarden_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};

use crate::orchestrator::Mode;

/// Parsed command line.
#[derive(Debug, Parser)]
#[command(
    name = "seedwarden",
    version,
    about = "Rule-driven cleanup and relabeling for torrent clients"
)]
pub struct Cli {
    /// Configuration file (defaults to `config.yaml`).
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,
    /// Log level directive; `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Log output format: `json` or `pretty`.
    #[arg(long, global = true, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
    /// Log decisions without changing anything on the backends.
    #[arg(long, global = true)]
    pub dry_run: bool,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Remove torrents matched by the remove rules.
    Clean(ClientArgs),
    /// Apply label rules to matching torrents.
    Relabel(ClientArgs),
}

/// Client selection shared by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct ClientArgs {
    /// Configured client names; every enabled client when omitted.
    pub clients: Vec<String>,
}

impl Command {
    /// Run mode for the orchestrator.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Clean(_) => Mode::Clean,
            Self::Relabel(_) => Mode::Relabel,
        }
    }

    /// Selected client names.
    #[must_use]
    pub fn clients(&self) -> &[String] {
        match self {
            Self::Clean(args) | Self::Relabel(args) => &args.clients,
        }
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse::<LogFormat>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_accepts_client_names_and_global_flags() {
        let cli = Cli::try_parse_from([
            "seedwarden",
            "--config",
            "/etc/seedwarden.yaml",
            "clean",
            "--dry-run",
            "seedbox",
            "nas",
        ])
        .expect("valid arguments");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/seedwarden.yaml")));
        assert!(cli.dry_run);
        assert_eq!(cli.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(cli.command.mode(), Mode::Clean);
        assert_eq!(cli.command.clients(), ["seedbox", "nas"]);
    }

    #[test]
    fn relabel_without_names_selects_all() {
        let cli = Cli::try_parse_from(["seedwarden", "--log-format", "json", "relabel"])
            .expect("valid arguments");
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.command.mode(), Mode::Relabel);
        assert!(cli.command.clients().is_empty());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["seedwarden", "--log-format", "xml", "clean"]).is_err());
        assert!(Cli::try_parse_from(["seedwarden"]).is_err());
    }
}
