//! In-memory token cache keyed by scope.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Duration;
use synseq_core::{AccessToken, AuthError, TokenProvider};
use tokio::sync::Mutex;
use tracing::debug;

/// Refresh this long before expiry.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// Reuses tokens from an inner provider until they are near expiry.
///
/// Tokens without a known expiry are cached for the life of the process.
pub struct CachingTokenProvider<P> {
    inner: P,
    buffer: Duration,
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl<P: TokenProvider> CachingTokenProvider<P> {
    /// Wrap `inner` with the default five minute buffer.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            buffer: Duration::seconds(EXPIRY_BUFFER_SECS),
            tokens: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for CachingTokenProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn acquire(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let mut tokens = self.tokens.lock().await;
        if let Some(token) = tokens.get(scope) {
            if !token.expires_within(self.buffer) {
                return Ok(token.clone());
            }
            debug!(scope, "cached token near expiry, refreshing");
        }

        let token = self.inner.acquire(scope).await?;
        let _ = tokens.insert(scope.to_string(), token.clone());
        Ok(token)
    }

    async fn invalidate(&self, scope: &str) {
        if self.tokens.lock().await.remove(scope).is_some() {
            debug!(scope, "dropped rejected token");
        }
        self.inner.invalidate(scope).await;
    }
}
