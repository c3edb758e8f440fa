//! Launch and watch capabilities consumed by the orchestrator.
//!
//! The orchestrator only sees these traits, so its fail-fast state machine
//! can be exercised with in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::{LaunchError, PollError};
use crate::ids::{JobName, RunId};
use crate::status::RunStatus;

/// Parameters for one submission: string keys to arbitrary JSON values.
pub type JobParameters = serde_json::Map<String, serde_json::Value>;

/// Terminal observation of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    /// The run.
    pub run_id: RunId,
    /// Terminal status. Never non-terminal.
    pub status: RunStatus,
    /// Service diagnostic message.
    pub message: Option<String>,
    /// Number of status requests made.
    pub polls: u32,
    /// Service-reported start time.
    pub run_start: Option<DateTime<Utc>>,
    /// Service-reported end time.
    pub run_end: Option<DateTime<Utc>>,
    /// Service-reported duration.
    pub duration_ms: Option<u64>,
}

impl RunOutcome {
    /// Outcome with only the fields the orchestrator needs.
    #[must_use]
    pub fn new(run_id: RunId, status: RunStatus) -> Self {
        Self {
            run_id,
            status,
            message: None,
            polls: 0,
            run_start: None,
            run_end: None,
            duration_ms: None,
        }
    }
}

/// Submits a named job and returns its run identifier.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Submit `job` with `parameters`. Retries transient failures internally.
    async fn launch(
        &self,
        job: &JobName,
        parameters: &JobParameters,
        cancel: &CancellationToken,
    ) -> Result<RunId, LaunchError>;
}

/// Waits for a run to reach a terminal status.
#[async_trait]
pub trait RunWatcher: Send + Sync {
    /// Poll `run_id` until its status is terminal.
    async fn wait(
        &self,
        run_id: &RunId,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PollError>;
}
