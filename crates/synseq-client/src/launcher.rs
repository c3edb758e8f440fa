//! Fixed-delay retrying submission.

use std::sync::Arc;

use async_trait::async_trait;
use synseq_core::{
    JobLauncher, JobName, JobParameters, LaunchError, RequestError, RetryConfig, RunId,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::client::SynapseClient;

/// [`JobLauncher`] that submits over HTTP and retries transient failures.
///
/// `max_attempts` counts every submission including the first. Token
/// acquisition failures use up an attempt like any other retryable error.
#[derive(Debug)]
pub struct HttpJobLauncher {
    client: Arc<SynapseClient>,
    retry: RetryConfig,
}

impl HttpJobLauncher {
    /// Launcher over `client` with `retry` policy.
    pub fn new(client: Arc<SynapseClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl JobLauncher for HttpJobLauncher {
    #[tracing::instrument(skip_all, fields(job = %job))]
    async fn launch(
        &self,
        job: &JobName,
        parameters: &JobParameters,
        cancel: &CancellationToken,
    ) -> Result<RunId, LaunchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(LaunchError::Cancelled);
            }
            attempt += 1;
            info!(attempt, max_attempts, "launching pipeline");

            let err = match self.client.create_run(job, parameters).await {
                Ok(run_id) => {
                    info!(%run_id, attempt, "pipeline launched");
                    return Ok(run_id);
                }
                Err(RequestError::InvalidBody(body)) => {
                    error!(%body, "createRun response has no runId");
                    return Err(LaunchError::MalformedResponse {
                        job: job.clone(),
                        body,
                    });
                }
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, kind = e.kind(), "launch rejected");
                    return Err(LaunchError::Rejected {
                        job: job.clone(),
                        source: e,
                    });
                }
                Err(e) => e,
            };

            if attempt >= max_attempts {
                error!(attempt, error = %err, kind = err.kind(), "launch retries exhausted");
                return Err(LaunchError::Exhausted {
                    job: job.clone(),
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.retry.delay_for(err.retry_after_ms());
            warn!(
                attempt,
                max_attempts,
                kind = err.kind(),
                error = %err,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "launch failed, retrying"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Err(LaunchError::Cancelled),
            }
        }
    }
}
