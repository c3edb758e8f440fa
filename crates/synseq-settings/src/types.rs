//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]`. Each type implements
//! [`Default`] with production values, and sections are `#[serde(default)]`
//! so partial JSON is accepted.

use serde::{Deserialize, Serialize};
use synseq_core::{JobName, JobParameters, PollConfig, RetryConfig};

use crate::errors::{Result, SettingsError};

/// Bronze-layer pipelines, in execution order.
pub const DEFAULT_PIPELINES: &[&str] = &[
    "copy_core_account_to_bronze",
    "copy_core_customer_to_bronze",
    "copy_core_transaction_to_bronze2",
    "copy_ops_app_log_to_bronze",
    "copy_ops_infra_metric_to_bronze",
];

/// Public client used for developer sign-in flows.
pub const DEVELOPER_SIGN_ON_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

/// Root settings type.
///
/// ```json
/// {
///   "workspace": "syn-interbank-lake",
///   "pipelines": ["copy_core_account_to_bronze", {"name": "b", "parameters": {"day": 1}}],
///   "poll": { "intervalMs": 30000 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynseqSettings {
    /// Workspace name, the first label of the endpoint host.
    pub workspace: String,
    /// Service DNS suffix appended to the workspace.
    pub service_domain: String,
    /// Data-plane API version sent as `api-version`.
    pub api_version: String,
    /// Full base URL, overriding `https://{workspace}.{serviceDomain}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Pipelines to run, in order.
    pub pipelines: Vec<PipelineSpec>,
    /// Submission retry policy.
    pub launch: RetryConfig,
    /// Status polling cadence.
    pub poll: PollConfig,
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Credential settings.
    pub auth: AuthSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl Default for SynseqSettings {
    fn default() -> Self {
        Self {
            workspace: "syn-interbank-lake".to_string(),
            service_domain: "dev.azuresynapse.net".to_string(),
            api_version: "2020-12-01".to_string(),
            endpoint: None,
            pipelines: DEFAULT_PIPELINES
                .iter()
                .map(|name| PipelineSpec::named(*name))
                .collect(),
            launch: RetryConfig::default(),
            poll: PollConfig::default(),
            http: HttpSettings::default(),
            auth: AuthSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SynseqSettings {
    /// Base URL of the orchestration endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.{}", self.workspace, self.service_domain))
    }

    /// Reject settings the sequencer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_none() && self.workspace.trim().is_empty() {
            return Err(SettingsError::InvalidValue("workspace is empty".into()));
        }
        if self.api_version.trim().is_empty() {
            return Err(SettingsError::InvalidValue("apiVersion is empty".into()));
        }
        if self.poll.interval_ms == 0 {
            return Err(SettingsError::InvalidValue("poll.intervalMs must be > 0".into()));
        }
        if self.launch.max_attempts == 0 {
            return Err(SettingsError::InvalidValue(
                "launch.maxAttempts must be > 0".into(),
            ));
        }
        if let Some(pos) = self.pipelines.iter().position(|p| p.name.trim().is_empty()) {
            return Err(SettingsError::InvalidValue(format!(
                "pipelines[{pos}] has an empty name"
            )));
        }
        Ok(())
    }
}

// ── Pipelines ───────────────────────────────────────────────────────────────

/// One entry of the ordered job list.
///
/// Accepts either a bare name string or `{ "name": ..., "parameters": {...} }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPipelineSpec")]
pub struct PipelineSpec {
    /// Pipeline definition name.
    pub name: JobName,
    /// Submission parameters. Empty by default.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub parameters: JobParameters,
}

impl PipelineSpec {
    /// Entry with no parameters.
    #[must_use]
    pub fn named(name: impl Into<JobName>) -> Self {
        Self {
            name: name.into(),
            parameters: JobParameters::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPipelineSpec {
    Name(JobName),
    Detailed {
        name: JobName,
        #[serde(default)]
        parameters: JobParameters,
    },
}

impl From<RawPipelineSpec> for PipelineSpec {
    fn from(raw: RawPipelineSpec) -> Self {
        match raw {
            RawPipelineSpec::Name(name) => Self::named(name),
            RawPipelineSpec::Detailed { name, parameters } => Self { name, parameters },
        }
    }
}

// ── HTTP ────────────────────────────────────────────────────────────────────

/// HTTP client settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    /// Per-request timeout in ms.
    pub request_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 60_000,
        }
    }
}

// ── Auth ────────────────────────────────────────────────────────────────────

/// Which credential backend to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMethod {
    /// Interactive device-code sign-in.
    #[default]
    DeviceCode,
    /// Non-interactive client-credentials grant.
    ClientSecret,
    /// Pre-issued bearer token.
    Static,
}

/// Credential settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Backend selection.
    pub method: AuthMethod,
    /// Token scope for the orchestration service.
    pub scope: String,
    /// Identity platform host.
    pub authority_host: String,
    /// Directory (tenant) ID or `organizations`.
    pub tenant_id: String,
    /// Application (client) ID.
    pub client_id: String,
    /// Client secret for [`AuthMethod::ClientSecret`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Bearer token for [`AuthMethod::Static`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Reuse tokens until shortly before expiry.
    pub cache_tokens: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            method: AuthMethod::default(),
            scope: "https://dev.azuresynapse.net/.default".to_string(),
            authority_host: "https://login.microsoftonline.com".to_string(),
            tenant_id: "organizations".to_string(),
            client_id: DEVELOPER_SIGN_ON_CLIENT_ID.to_string(),
            client_secret: None,
            access_token: None,
            cache_tokens: true,
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthSettings")
            .field("method", &self.method)
            .field("scope", &self.scope)
            .field("authority_host", &self.authority_host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("access_token", &redact(&self.access_token))
            .field("cache_tokens", &self.cache_tokens)
            .finish()
    }
}

// ── Logging ─────────────────────────────────────────────────────────────────

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogFormat {
    /// Human-readable single line.
    #[default]
    Compact,
    /// JSON lines.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
