//! # synseq
//!
//! Runs the configured Synapse pipelines one after another and stops at the
//! first failure. Exit status is 0 when every pipeline succeeded, 1 otherwise.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use synseq_runtime::run_from_settings;
use synseq_settings::{LogFormat, load_required_settings, load_settings_from_path, settings_path};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Sequential fail-fast Synapse pipeline runner.
#[derive(Parser, Debug)]
#[command(name = "synseq", version, about = "Run Synapse pipelines in order, fail-fast")]
struct Cli {
    /// Settings file, which must exist. Without it `~/.synseq/settings.json`
    /// is used when present and the compiled defaults otherwise.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter directive, overriding `logging.level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("synseq: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let settings = match &args.settings {
        Some(path) => load_required_settings(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => {
            let path = settings_path();
            load_settings_from_path(&path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?
        }
    };

    let level = args.log_level.as_deref().unwrap_or(&settings.logging.level);
    synseq_logging::init_subscriber(level, settings.logging.format == LogFormat::Json);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current wait");
            trigger.cancel();
        }
    });

    let report = run_from_settings(&settings, cancel).await?;
    for record in &report.jobs {
        info!(
            job = %record.job,
            run_id = %record.run_id,
            status = %record.status,
            elapsed_ms = record.elapsed_ms,
            "pipeline summary"
        );
    }
    info!(sequence_id = %report.sequence_id, jobs = report.jobs.len(), "sequence completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["synseq"]);
        assert!(cli.settings.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn cli_settings_path() {
        let cli = Cli::parse_from(["synseq", "--settings", "/etc/synseq.json"]);
        assert_eq!(cli.settings, Some(PathBuf::from("/etc/synseq.json")));
    }

    #[tokio::test]
    async fn missing_explicit_settings_file_is_an_error() {
        let cli = Cli::parse_from(["synseq", "--settings", "/nonexistent/synseq/settings.json"]);
        let err = run(cli).await.unwrap_err();
        assert!(format!("{err:#}").contains("settings file not found"), "{err:#}");
    }

    #[test]
    fn cli_log_level() {
        let cli = Cli::parse_from(["synseq", "--log-level", "debug"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
