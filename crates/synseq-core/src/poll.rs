//! Polling cadence for run status.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between status polls in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

/// How often to poll and how long to wait at most.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Interval between polls in ms (default: 30000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Give up after this long. `None` waits indefinitely.
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_wait_ms: None,
        }
    }
}

impl PollConfig {
    /// Interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Maximum wait as a [`Duration`].
    #[must_use]
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}
