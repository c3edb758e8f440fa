//! Interactive device-code sign-in.
//!
//! The user is shown a short code and a verification URL on stderr, signs in
//! from any browser, and the provider polls the token endpoint until the
//! sign-in completes. The refresh token from a completed sign-in is kept in
//! memory so later acquisitions in the same process do not prompt again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use synseq_core::{AccessToken, AuthError, TokenProvider};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::oauth::{self, FormError, TokenResponse};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Added to the polling interval on `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Interval used when the device code response omits one.
const DEFAULT_INTERVAL_SECS: u64 = 5;

/// What the user needs to complete sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceCodePrompt {
    /// Code to type at the verification page.
    pub user_code: String,
    /// Page to visit.
    pub verification_uri: String,
    /// Ready-made instruction text from the identity platform.
    pub message: String,
}

/// Callback that shows the prompt to the user.
pub type PromptFn = Arc<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Device authorization grant against the identity platform.
pub struct DeviceCodeProvider {
    client: reqwest::Client,
    device_code_url: String,
    token_url: String,
    client_id: String,
    refresh_token: Mutex<Option<String>>,
    prompt: PromptFn,
}

impl DeviceCodeProvider {
    /// Provider for `tenant_id` on `authority_host`, prompting on stderr.
    pub fn new(authority_host: &str, tenant_id: &str, client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            device_code_url: oauth::endpoint_url(authority_host, tenant_id, "devicecode"),
            token_url: oauth::endpoint_url(authority_host, tenant_id, "token"),
            client_id: client_id.into(),
            refresh_token: Mutex::new(None),
            prompt: Arc::new(|p: &DeviceCodePrompt| eprintln!("{}", p.message)),
        }
    }

    /// Replace the stderr prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptFn) -> Self {
        self.prompt = prompt;
        self
    }

    /// Use a shared HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn refresh(&self, refresh_token: &str, scope: &str) -> Result<TokenResponse, FormError> {
        oauth::post_form(
            &self.client,
            &self.token_url,
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", scope),
            ],
        )
        .await
    }

    async fn sign_in(&self, scope: &str) -> Result<TokenResponse, AuthError> {
        let device: DeviceCodeResponse = oauth::post_form(
            &self.client,
            &self.device_code_url,
            &[("client_id", self.client_id.as_str()), ("scope", scope)],
        )
        .await?;

        let message = device.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {}.",
                device.verification_uri, device.user_code
            )
        });
        (self.prompt)(&DeviceCodePrompt {
            user_code: device.user_code.clone(),
            verification_uri: device.verification_uri.clone(),
            message,
        });

        let deadline = Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval = Duration::from_secs(device.interval.unwrap_or(DEFAULT_INTERVAL_SECS));

        loop {
            tokio::time::sleep(interval).await;
            if Instant::now() >= deadline {
                return Err(AuthError::Expired);
            }

            let result = oauth::post_form::<TokenResponse>(
                &self.client,
                &self.token_url,
                &[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", device.device_code.as_str()),
                ],
            )
            .await;

            match result {
                Ok(resp) => return Ok(resp),
                Err(FormError::Rejected {
                    code: Some(code),
                    message,
                    status,
                }) => match code.as_str() {
                    "authorization_pending" => debug!("sign-in pending"),
                    "slow_down" => {
                        interval += SLOW_DOWN_STEP;
                        debug!(interval_secs = interval.as_secs(), "slowing down polling");
                    }
                    "authorization_declined" | "access_denied" => {
                        return Err(AuthError::Declined(message));
                    }
                    "expired_token" | "code_expired" => return Err(AuthError::Expired),
                    _ => return Err(AuthError::OAuth { status, message }),
                },
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl std::fmt::Debug for DeviceCodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for DeviceCodeProvider {
    fn name(&self) -> &str {
        "device_code"
    }

    #[tracing::instrument(skip_all, fields(provider = "device_code", scope = %scope))]
    async fn acquire(&self, scope: &str) -> Result<AccessToken, AuthError> {
        // Held for the whole flow so concurrent callers share one prompt.
        let mut stored = self.refresh_token.lock().await;

        if let Some(rt) = stored.clone() {
            match self.refresh(&rt, scope).await {
                Ok(resp) => {
                    let (token, rotated) = resp.into_access_token();
                    if let Some(rotated) = rotated {
                        *stored = Some(rotated);
                    }
                    debug!("refreshed token without prompting");
                    return Ok(token);
                }
                Err(e) => {
                    warn!(error = %AuthError::from(e), "refresh failed, signing in again");
                    *stored = None;
                }
            }
        }

        let (token, refresh) = self.sign_in(scope).await?.into_access_token();
        *stored = refresh;
        info!(expires_at = ?token.expires_at, "device code sign-in completed");
        Ok(token)
    }
}
