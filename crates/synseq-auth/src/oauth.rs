//! Identity platform token endpoint plumbing shared by the OAuth backends.

use serde::Deserialize;
use synseq_core::{AccessToken, AuthError};

/// Lifetime assumed when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Build `{authority}/{tenant}/oauth2/v2.0/{leaf}`.
pub(crate) fn endpoint_url(authority_host: &str, tenant_id: &str, leaf: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/{leaf}",
        authority_host.trim_end_matches('/'),
        tenant_id
    )
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    pub fn into_access_token(self) -> (AccessToken, Option<String>) {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        (
            AccessToken::expiring_in(self.access_token, expires_in),
            self.refresh_token,
        )
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Why a form POST to the identity platform failed.
#[derive(Debug)]
pub(crate) enum FormError {
    /// No HTTP response.
    Network(String),
    /// Non-2xx with an OAuth error code when one could be parsed.
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// 2xx with an unparseable body.
    Invalid(String),
}

impl From<FormError> for AuthError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::Network(msg) => AuthError::Network(msg),
            FormError::Rejected { status, message, .. } => AuthError::OAuth { status, message },
            FormError::Invalid(msg) => AuthError::InvalidResponse(msg),
        }
    }
}

/// POST a URL-encoded form and decode a JSON body of type `T`.
pub(crate) async fn post_form<T>(
    client: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<T, FormError>
where
    T: for<'de> Deserialize<'de>,
{
    let resp = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| FormError::Network(e.to_string()))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| FormError::Network(e.to_string()))?;

    if !status.is_success() {
        let parsed = serde_json::from_str::<ErrorBody>(&text).ok();
        let message = match &parsed {
            Some(ErrorBody {
                error,
                error_description: Some(desc),
            }) => format!("{error}: {desc}"),
            Some(ErrorBody { error, .. }) => error.clone(),
            None => text,
        };
        return Err(FormError::Rejected {
            status: status.as_u16(),
            code: parsed.map(|b| b.error),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| FormError::Invalid(e.to_string()))
}
