//! Process bootstrap: logging, configuration, client construction, task fan-out.

use clap::Parser;
use seedwarden_config::{ClientKind, Config, load_config, resolve_config_path};
use seedwarden_qbittorrent::{QbittorrentClient, QbittorrentSettings};
use seedwarden_telemetry::{LogFormat, LoggingConfig, RunContextGuard, client_span, init_logging};
use seedwarden_torrent_core::TorrentClient;
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::orchestrator::{Mode, RunOptions, RunSummary, run_client};

/// One configured backend ready to be driven by the orchestrator.
pub struct ClientTask {
    /// Configured client name.
    pub name: String,
    /// Backend adapter.
    pub client: Box<dyn TorrentClient>,
    /// Per-run options derived from configuration and flags.
    pub options: RunOptions,
}

/// Parse the process arguments and run the selected command.
///
/// # Errors
///
/// See [`run_with`].
pub async fn run_app() -> AppResult<()> {
    run_with(Cli::parse()).await
}

/// Install logging, load configuration, and drive every selected backend.
///
/// # Errors
///
/// Returns an [`AppError`] when logging or configuration cannot be set up,
/// when a client cannot be constructed, or when any backend run fails.
pub async fn run_with(cli: Cli) -> AppResult<()> {
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("SEEDWARDEN_BUILD_SHA").unwrap_or("dev"),
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;

    let mode = cli.command.mode();
    let _context = RunContextGuard::new(mode.as_str(), Uuid::new_v4());
    info!(dry_run = cli.dry_run, "seedwarden run starting");

    let path = resolve_config_path(cli.config.as_deref());
    let config = load_config(&path).map_err(|err| AppError::config("config.load", err))?;
    let tasks = build_clients(&config, cli.command.clients(), cli.dry_run)?;

    let summary = run_tasks(tasks, mode).await?;
    info!(
        ignored = summary.ignored,
        removed = summary.removed,
        relabeled = summary.relabeled,
        failed = summary.failed,
        freed_bytes = summary.freed_bytes,
        "seedwarden run finished"
    );
    Ok(())
}

/// Build one adapter per selected client.
///
/// # Errors
///
/// Returns [`AppError::Config`] for unknown client or filter names and
/// [`AppError::Qbit`] when an adapter cannot be constructed.
pub fn build_clients(
    config: &Config,
    names: &[String],
    dry_run: bool,
) -> AppResult<Vec<ClientTask>> {
    let selected = config
        .select_clients(names)
        .map_err(|err| AppError::config("config.select_clients", err))?;

    selected
        .into_iter()
        .map(|(name, client)| -> AppResult<ClientTask> {
            let rules = config
                .rule_set(&client.filter)
                .map_err(|err| AppError::config("config.rule_set", err))?;
            let kind = client
                .client_kind()
                .map_err(|err| AppError::config("config.client_kind", err))?;
            let adapter: Box<dyn TorrentClient> = match kind {
                ClientKind::Qbittorrent => {
                    let settings = QbittorrentSettings {
                        name: name.to_string(),
                        url: client.url.clone(),
                        user: client.user.clone(),
                        password: client.password.clone(),
                        timeout: client.timeout(),
                    };
                    let adapter = QbittorrentClient::new(settings, rules)
                        .map_err(|err| AppError::qbit("qbittorrent.new", name.to_string(), err))?;
                    Box::new(adapter)
                }
            };
            Ok(ClientTask {
                name: name.to_string(),
                client: adapter,
                options: RunOptions {
                    dry_run,
                    free_space_path: client.free_space_path.clone(),
                },
            })
        })
        .collect()
}

/// Run every task concurrently and aggregate the summaries.
///
/// # Errors
///
/// Returns [`AppError::Join`] if a task panicked, otherwise
/// [`AppError::BackendFailures`] when at least one backend run failed.
pub async fn run_tasks(tasks: Vec<ClientTask>, mode: Mode) -> AppResult<RunSummary> {
    let total = tasks.len();
    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let ClientTask {
                name,
                mut client,
                options,
            } = task;
            let span = client_span(&name, client.kind());
            let handle = tokio::spawn(
                async move {
                    let outcome = run_client(client.as_mut(), mode, &options).await;
                    if let Err(err) = &outcome {
                        error!(error = %err, fatal = err.is_fatal(), "backend run failed");
                    }
                    outcome
                }
                .instrument(span),
            );
            (name, handle)
        })
        .collect();

    let mut summary = RunSummary::default();
    let mut failed = 0;
    for (name, handle) in handles {
        match handle
            .await
            .map_err(|err| AppError::join("backend.run", name, err))?
        {
            Ok(outcome) => summary.absorb(outcome),
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        return Err(AppError::BackendFailures { failed, total });
    }
    Ok(summary)
}
