//! Bearer credentials and the token provider capability.
//!
//! The provider is injected into the launcher and watcher rather than held in
//! process-wide state, so tests and non-interactive deployments can swap the
//! backend without touching callers.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::errors::AuthError;

/// Short-lived bearer token scoped to the remote service.
///
/// The secret is redacted in `Debug` output and zeroized on drop.
#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    /// When the token stops being accepted. `None` means unknown / never.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: SecretString::from(token.into()),
            expires_at,
        }
    }

    /// Token that expires `expires_in_secs` from now.
    #[must_use]
    pub fn expiring_in(token: impl Into<String>, expires_in_secs: i64) -> Self {
        Self::new(token, Some(Utc::now() + Duration::seconds(expires_in_secs)))
    }

    /// The raw token, for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }

    /// Whether the token expires within `buffer` of now.
    #[must_use]
    pub fn expires_within(&self, buffer: Duration) -> bool {
        self.expires_at
            .is_some_and(|at| at - Utc::now() < buffer)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Obtains bearer credentials for a service scope.
///
/// The contract is "produce a valid token or fail". Implementations may
/// prompt interactively or cache; callers cannot tell the difference.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short backend name for logging.
    fn name(&self) -> &str;

    /// Acquire a token for `scope`.
    async fn acquire(&self, scope: &str) -> Result<AccessToken, AuthError>;

    /// Forget any token held for `scope` after the service rejected it.
    ///
    /// The next [`acquire`](Self::acquire) must not return the same token.
    /// Providers that never reuse tokens keep the default no-op.
    async fn invalidate(&self, _scope: &str) {}
}

impl std::fmt::Debug for dyn TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider").field("name", &self.name()).finish()
    }
}
