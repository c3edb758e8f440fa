//! Pre-issued bearer token.

use async_trait::async_trait;
use synseq_core::{AccessToken, AuthError, TokenProvider};

/// Hands out the same token for every scope.
///
/// Useful when a scheduler injects a token (e.g. `SYNSEQ_ACCESS_TOKEN`) and
/// for tests. The token is assumed never to expire.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn acquire(&self, _scope: &str) -> Result<AccessToken, AuthError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_same_token_for_any_scope() {
        let provider = StaticTokenProvider::new("abc");
        let a = provider.acquire("scope-a").await.unwrap();
        let b = provider.acquire("scope-b").await.unwrap();
        assert_eq!(a.expose(), "abc");
        assert_eq!(b.expose(), "abc");
        assert!(a.expires_at.is_none());
        assert_eq!(provider.name(), "static");
    }
}
