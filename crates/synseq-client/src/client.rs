//! Thin HTTP client for the Synapse pipeline data-plane API.
//!
//! Two calls are used:
//!
//! - `POST {base}/pipelines/{name}/createRun?api-version=..` with the
//!   parameters object as the body, returning `{ "runId": ".." }`
//! - `GET {base}/pipelineruns/{runId}?api-version=..`, returning the run
//!   record with `status`, `message`, `runStart`, `runEnd`, `durationInMs`
//!
//! Every request acquires its own bearer token from the injected
//! [`TokenProvider`]. A 401 invalidates that token so the next attempt
//! fetches a new one. Failures are classified into [`RequestError`] and never
//! retried here; the launcher owns the retry policy.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use synseq_core::retry::parse_retry_after_header;
use synseq_core::{JobName, JobParameters, RequestError, RunId, RunStatus, TokenProvider};
use thiserror::Error;
use tracing::debug;

/// Longest response body kept in an error.
const MAX_ERROR_BODY_CHARS: usize = 2048;

/// Errors constructing a [`SynapseClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL does not parse or cannot take path segments.
    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl {
        /// URL as configured.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Connection parameters for [`SynapseClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Workspace endpoint, e.g. `https://syn-interbank-lake.dev.azuresynapse.net`.
    pub base_url: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Token scope requested from the provider.
    pub scope: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// Run record as reported by the service.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSnapshot {
    /// Current status. Absent statuses surface as `Other("")`.
    pub status: RunStatus,
    /// Diagnostic message, `None` when absent or empty.
    pub message: Option<String>,
    /// When the run started.
    pub run_start: Option<DateTime<Utc>>,
    /// When the run ended.
    pub run_end: Option<DateTime<Utc>>,
    /// Reported duration.
    pub duration_ms: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRunBody {
    #[serde(default)]
    run_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    run_start: Option<String>,
    #[serde(default)]
    run_end: Option<String>,
    #[serde(default)]
    duration_in_ms: Option<u64>,
}

impl From<RunBody> for RunSnapshot {
    fn from(body: RunBody) -> Self {
        Self {
            status: RunStatus::parse(body.status.as_deref().unwrap_or_default()),
            message: body.message.filter(|m| !m.is_empty()),
            run_start: body.run_start.as_deref().and_then(parse_timestamp),
            run_end: body.run_end.as_deref().and_then(parse_timestamp),
            duration_ms: body.duration_in_ms,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Client for one workspace endpoint.
pub struct SynapseClient {
    http: reqwest::Client,
    base_url: Url,
    api_version: String,
    scope: String,
    tokens: Arc<dyn TokenProvider>,
}

impl SynapseClient {
    /// Build a client that authenticates with `tokens`.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: config.base_url,
                reason: "not a hierarchical URL".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_version: config.api_version,
            scope: config.scope,
            tokens,
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base() was rejected in new(), so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            let _ = path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Submit `job` and return the new run's identifier.
    ///
    /// A 2xx response without a non-empty `runId` is [`RequestError::InvalidBody`].
    pub async fn create_run(
        &self,
        job: &JobName,
        parameters: &JobParameters,
    ) -> Result<RunId, RequestError> {
        let token = self.tokens.acquire(&self.scope).await?;
        let url = self.endpoint(&["pipelines", job.as_str(), "createRun"]);
        debug!(%url, "POST createRun");

        let resp = self
            .http
            .post(url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(token.expose())
            .json(parameters)
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let body = self.read_body(resp).await?;

        serde_json::from_str::<CreateRunBody>(&body)
            .ok()
            .and_then(|b| b.run_id)
            .filter(|id| !id.is_empty())
            .map(RunId::from_string)
            .ok_or(RequestError::InvalidBody(body))
    }

    /// Fetch the current record of `run_id`.
    pub async fn get_run(&self, run_id: &RunId) -> Result<RunSnapshot, RequestError> {
        let token = self.tokens.acquire(&self.scope).await?;
        let url = self.endpoint(&["pipelineruns", run_id.as_str()]);
        debug!(%url, "GET pipelinerun");

        let resp = self
            .http
            .get(url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let body = self.read_body(resp).await?;

        serde_json::from_str::<RunBody>(&body)
            .map(RunSnapshot::from)
            .map_err(|_| RequestError::InvalidBody(body))
    }

    async fn read_body(&self, resp: reqwest::Response) -> Result<String, RequestError> {
        let result = read_success_body(resp).await;
        if let Err(RequestError::Status { status: 401, .. }) = &result {
            debug!(provider = self.tokens.name(), "token rejected, invalidating");
            self.tokens.invalidate(&self.scope).await;
        }
        result
    }
}

impl std::fmt::Debug for SynapseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynapseClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("tokens", &self.tokens.name())
            .finish_non_exhaustive()
    }
}

/// Return the body of a 2xx response, or classify the failure.
async fn read_success_body(resp: reqwest::Response) -> Result<String, RequestError> {
    let status = resp.status();
    let retry_after_ms = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after_header);

    let body = resp
        .text()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    Err(RequestError::Status {
        status: status.as_u16(),
        body: truncate_body(body),
        retry_after_ms: retry_after_ms.filter(|_| honours_retry_after(status)),
    })
}

fn honours_retry_after(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    )
}

fn truncate_body(mut body: String) -> String {
    if let Some((idx, _)) = body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        body.truncate(idx);
        body.push('…');
    }
    body
}
