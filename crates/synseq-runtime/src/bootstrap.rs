//! Wiring from settings to a ready orchestrator.

use std::sync::Arc;
use std::time::Duration;

use synseq_auth::build_token_provider;
use synseq_client::{ClientConfig, ClientError, HttpJobLauncher, HttpRunWatcher, SynapseClient};
use synseq_core::{AuthError, SequenceError};
use synseq_settings::{SettingsError, SynseqSettings, load_settings};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::orchestrator::{SequenceOrchestrator, SequenceReport};

/// Anything that can stop a configured run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Settings could not be loaded or are invalid.
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),

    /// The token provider could not be constructed.
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    /// The HTTP client could not be constructed.
    #[error("client: {0}")]
    Client(#[from] ClientError),

    /// The sequence ran and failed.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Build the orchestrator described by `settings`.
pub fn build_orchestrator(settings: &SynseqSettings) -> Result<SequenceOrchestrator, RuntimeError> {
    let tokens = build_token_provider(&settings.auth)?;
    let client = Arc::new(SynapseClient::new(
        ClientConfig {
            base_url: settings.base_url(),
            api_version: settings.api_version.clone(),
            scope: settings.auth.scope.clone(),
            request_timeout: Duration::from_millis(settings.http.request_timeout_ms),
        },
        tokens,
    )?);

    info!(
        endpoint = %client.base_url(),
        auth = ?settings.auth.method,
        jobs = settings.pipelines.len(),
        "orchestrator configured"
    );

    let launcher = Arc::new(HttpJobLauncher::new(Arc::clone(&client), settings.launch.clone()));
    let watcher = Arc::new(HttpRunWatcher::new(client, settings.poll.clone()));
    Ok(SequenceOrchestrator::new(
        settings.pipelines.clone(),
        launcher,
        watcher,
    ))
}

/// Run the configured sequence until it completes, fails, or `cancel` fires.
pub async fn run_from_settings(
    settings: &SynseqSettings,
    cancel: CancellationToken,
) -> Result<SequenceReport, RuntimeError> {
    let orchestrator = build_orchestrator(settings)?;
    Ok(orchestrator.run(&cancel).await?)
}

/// Load `~/.synseq/settings.json` plus environment and run to completion.
pub async fn run_default() -> Result<SequenceReport, RuntimeError> {
    let settings = load_settings()?;
    run_from_settings(&settings, CancellationToken::new()).await
}
