//! Retry configuration for job submission.
//!
//! Submissions use a fixed delay between attempts rather than exponential
//! backoff. A `Retry-After` hint from the service can only lengthen the
//! delay, never shorten it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default total submission attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 10_000;

/// Fixed-delay retry policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts in ms (default: 10000).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// Delay before the next attempt, honouring a server hint when it is longer.
    #[must_use]
    pub fn delay_for(&self, retry_after_ms: Option<u64>) -> Duration {
        let ms = retry_after_ms.map_or(self.delay_ms, |hint| hint.max(self.delay_ms));
        Duration::from_millis(ms)
    }
}

/// Parse a `Retry-After` HTTP header value.
///
/// The value can be either:
/// - A number of seconds (e.g. `"120"`)
/// - An HTTP-date (e.g. `"Thu, 01 Dec 2025 16:00:00 GMT"`)
///
/// Returns the delay in milliseconds, or `None` if parsing fails.
#[must_use]
pub fn parse_retry_after_header(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(seconds.saturating_mul(1000));
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delay_ms = date
        .signed_duration_since(chrono::Utc::now())
        .num_milliseconds();
    Some(u64::try_from(delay_ms).unwrap_or(0))
}
