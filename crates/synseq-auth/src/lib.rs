//! # synseq-auth
//!
//! [`TokenProvider`] backends for the orchestration endpoint.
//!
//! - [`StaticTokenProvider`]: a pre-issued token
//! - [`ClientSecretProvider`]: app-only client credentials
//! - [`DeviceCodeProvider`]: interactive device-code sign-in
//! - [`CachingTokenProvider`]: scope-keyed reuse until near expiry
//!
//! [`build_token_provider`] picks one from [`AuthSettings`].

#![deny(unsafe_code)]

pub mod cache;
pub mod client_secret;
pub mod device_code;
mod oauth;
pub mod static_token;

use std::sync::Arc;

use synseq_core::{AuthError, TokenProvider};
use synseq_settings::{AuthMethod, AuthSettings};

pub use cache::CachingTokenProvider;
pub use client_secret::ClientSecretProvider;
pub use device_code::{DeviceCodePrompt, DeviceCodeProvider, PromptFn};
pub use static_token::StaticTokenProvider;

/// Tenants that cannot issue app-only tokens.
const MULTI_TENANT_ALIASES: &[&str] = &["organizations", "common", "consumers"];

/// Construct the provider selected by `settings`.
///
/// Fails with [`AuthError::NotConfigured`] when the chosen method is missing
/// a credential.
pub fn build_token_provider(settings: &AuthSettings) -> Result<Arc<dyn TokenProvider>, AuthError> {
    match settings.method {
        AuthMethod::Static => {
            let token = settings.access_token.as_deref().ok_or_else(|| {
                AuthError::NotConfigured("auth.accessToken (or SYNSEQ_ACCESS_TOKEN)".into())
            })?;
            Ok(Arc::new(StaticTokenProvider::new(token)))
        }
        AuthMethod::ClientSecret => {
            let secret = settings.client_secret.as_deref().ok_or_else(|| {
                AuthError::NotConfigured("auth.clientSecret (or AZURE_CLIENT_SECRET)".into())
            })?;
            if MULTI_TENANT_ALIASES.contains(&settings.tenant_id.as_str()) {
                return Err(AuthError::NotConfigured(
                    "auth.tenantId must name a tenant for client credentials".into(),
                ));
            }
            let provider = ClientSecretProvider::new(
                &settings.authority_host,
                &settings.tenant_id,
                settings.client_id.clone(),
                secret,
            );
            Ok(maybe_cached(provider, settings.cache_tokens))
        }
        AuthMethod::DeviceCode => {
            let provider = DeviceCodeProvider::new(
                &settings.authority_host,
                &settings.tenant_id,
                settings.client_id.clone(),
            );
            Ok(maybe_cached(provider, settings.cache_tokens))
        }
    }
}

fn maybe_cached<P: TokenProvider + 'static>(provider: P, cache: bool) -> Arc<dyn TokenProvider> {
    if cache {
        Arc::new(CachingTokenProvider::new(provider))
    } else {
        Arc::new(provider)
    }
}
