//! Error hierarchy for the pipeline sequencer.
//!
//! - [`AuthError`]: credential acquisition failures
//! - [`RequestError`]: one failed HTTP exchange, classified for retry
//! - [`LaunchError`]: submission exhausted its retries or got a malformed reply
//! - [`PollError`]: status polling failed, timed out, or was cancelled
//! - [`JobFailedError`]: a run reached a terminal status other than `Succeeded`
//! - [`SequenceError`]: what the orchestrator surfaces, always naming the job

use thiserror::Error;

use crate::ids::{JobName, RunId};
use crate::status::RunStatus;

// ─────────────────────────────────────────────────────────────────────────────
// AuthError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while acquiring a bearer token.
#[derive(Clone, Debug, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The token endpoint rejected the request.
    #[error("OAuth error ({status}): {message}")]
    OAuth {
        /// HTTP status code (0 if no response).
        status: u16,
        /// Error description.
        message: String,
    },

    /// Required credential settings are missing.
    #[error("credential not configured: {0}")]
    NotConfigured(String),

    /// The user declined the interactive sign-in.
    #[error("sign-in declined: {0}")]
    Declined(String),

    /// The interactive sign-in window elapsed.
    #[error("sign-in expired before completion")]
    Expired,

    /// The token endpoint returned something unparseable.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// RequestError
// ─────────────────────────────────────────────────────────────────────────────

/// A single failed exchange with the orchestration endpoint.
#[derive(Clone, Debug, Error)]
pub enum RequestError {
    /// Token acquisition failed before the request was sent.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Connection, TLS, or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
        /// Parsed `Retry-After` hint in milliseconds.
        retry_after_ms: Option<u64>,
    },

    /// Success status but a body that is not the expected JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl RequestError {
    /// Whether repeating the same request could succeed.
    ///
    /// Transport failures, 5xx, 408, 429, 401 and token failures are
    /// retryable. Other 4xx are not. A 401 is only worth repeating because
    /// the client invalidates the rejected token before the next attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(status, 401 | 408 | 429 | 500..=599),
            Self::InvalidBody(_) => false,
        }
    }

    /// Server-suggested delay, if any.
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Status { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Short classification string for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Transport(_) => "transport",
            Self::Status { status, .. } if *status >= 500 => "server",
            Self::Status { .. } => "client",
            Self::InvalidBody(_) => "invalid_body",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LaunchError
// ─────────────────────────────────────────────────────────────────────────────

/// Submission of a job failed.
#[derive(Clone, Debug, Error)]
pub enum LaunchError {
    /// Every attempt failed with a retryable error.
    #[error("launch of {job} failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Job being submitted.
        job: JobName,
        /// Attempts made.
        attempts: u32,
        /// Last observed error.
        last: RequestError,
    },

    /// The service refused the submission with a non-retryable error.
    #[error("launch of {job} rejected: {source}")]
    Rejected {
        /// Job being submitted.
        job: JobName,
        /// The refusal.
        source: RequestError,
    },

    /// The submission succeeded but no run identifier came back.
    #[error("launch of {job} returned no run id: {body}")]
    MalformedResponse {
        /// Job being submitted.
        job: JobName,
        /// Response body as received.
        body: String,
    },

    /// Cancelled while waiting between attempts.
    #[error("launch cancelled")]
    Cancelled,
}

// ─────────────────────────────────────────────────────────────────────────────
// PollError
// ─────────────────────────────────────────────────────────────────────────────

/// Waiting for a run failed before a terminal status was observed.
#[derive(Clone, Debug, Error)]
pub enum PollError {
    /// A status request failed. Not retried.
    #[error("status request for run {run_id} failed: {source}")]
    Request {
        /// Run being watched.
        run_id: RunId,
        /// The failure.
        source: RequestError,
    },

    /// The status response could not be parsed.
    #[error("status response for run {run_id} is malformed: {body}")]
    MalformedResponse {
        /// Run being watched.
        run_id: RunId,
        /// Response body as received.
        body: String,
    },

    /// The configured maximum wait elapsed.
    #[error("run {run_id} still {last_status} after {waited_ms}ms")]
    TimedOut {
        /// Run being watched.
        run_id: RunId,
        /// Time spent waiting.
        waited_ms: u64,
        /// Last status observed.
        last_status: RunStatus,
    },

    /// Cancelled by the supervising process. The remote run keeps going.
    #[error("wait cancelled")]
    Cancelled,
}

// ─────────────────────────────────────────────────────────────────────────────
// JobFailedError / SequenceError
// ─────────────────────────────────────────────────────────────────────────────

/// A run reached a terminal status other than `Succeeded`.
#[derive(Clone, Debug, Error)]
#[error("pipeline {job} finished with status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct JobFailedError {
    /// Job that failed.
    pub job: JobName,
    /// Its run.
    pub run_id: RunId,
    /// Terminal status observed.
    pub status: RunStatus,
    /// Service diagnostic message, if any.
    pub message: Option<String>,
}

/// Failure surfaced by the sequence orchestrator.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// A job could not be submitted.
    #[error("pipeline {job}: {source}")]
    Launch {
        /// Job that could not be launched.
        job: JobName,
        /// Underlying failure.
        #[source]
        source: LaunchError,
    },

    /// A job's run could not be watched to completion.
    #[error("pipeline {job}: {source}")]
    Poll {
        /// Job being watched.
        job: JobName,
        /// Underlying failure.
        #[source]
        source: PollError,
    },

    /// A job finished unsuccessfully. Remaining jobs were not started.
    #[error(transparent)]
    JobFailed(#[from] JobFailedError),

    /// The sequence was cancelled before `job` finished.
    #[error("sequence cancelled during {job}")]
    Cancelled {
        /// Job in flight when cancellation arrived.
        job: JobName,
    },
}

impl SequenceError {
    /// Job the failure is attributed to.
    #[must_use]
    pub fn job(&self) -> &JobName {
        match self {
            Self::Launch { job, .. } | Self::Poll { job, .. } | Self::Cancelled { job } => job,
            Self::JobFailed(e) => &e.job,
        }
    }

    /// Short classification string for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch { .. } => "launch",
            Self::Poll { .. } => "poll",
            Self::JobFailed(_) => "job_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
