//! Non-interactive client-credentials grant.

use async_trait::async_trait;
use synseq_core::{AccessToken, AuthError, TokenProvider};
use tracing::debug;

use crate::oauth::{self, TokenResponse};

/// Acquires app-only tokens with a client ID and secret.
pub struct ClientSecretProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientSecretProvider {
    /// Provider for `tenant_id` on `authority_host`.
    pub fn new(
        authority_host: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: oauth::endpoint_url(authority_host, tenant_id, "token"),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Use a shared HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl std::fmt::Debug for ClientSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for ClientSecretProvider {
    fn name(&self) -> &str {
        "client_secret"
    }

    #[tracing::instrument(skip_all, fields(provider = "client_secret", scope = %scope))]
    async fn acquire(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let resp: TokenResponse = oauth::post_form(
            &self.client,
            &self.token_url,
            &[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
            ],
        )
        .await?;

        let (token, _) = resp.into_access_token();
        debug!(expires_at = ?token.expires_at, "acquired client credentials token");
        Ok(token)
    }
}
