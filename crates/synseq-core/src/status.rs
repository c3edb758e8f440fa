//! Pipeline run status as reported by the remote service.
//!
//! Exactly three values are terminal: `Succeeded`, `Failed`, `Cancelled`.
//! Every other value, including strings the service has never documented,
//! keeps the watcher polling. Unrecognised strings are preserved in
//! [`RunStatus::Other`] so they can be logged verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a single pipeline run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    /// Accepted but not yet started.
    Queued,
    /// Executing.
    InProgress,
    /// Cancellation requested, not yet finished.
    Canceling,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Finished after cancellation.
    Cancelled,
    /// Any status string not listed above (or an absent status, as `""`).
    Other(String),
}

impl RunStatus {
    /// Parse a wire status. Never fails: unknown strings map to [`RunStatus::Other`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Queued" => Self::Queued,
            "InProgress" => Self::InProgress,
            "Canceling" => Self::Canceling,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether no further state change can occur for this run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Whether the run finished successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Whether this status is outside the documented set.
    #[must_use]
    pub fn is_unrecognised(&self) -> bool {
        matches!(self, Self::Other(_))
    }

    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "Queued",
            Self::InProgress => "InProgress",
            Self::Canceling => "Canceling",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(s) if s.is_empty() => f.write_str("<none>"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for RunStatus {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_three_terminal_statuses() {
        let terminal: Vec<_> = ["Queued", "InProgress", "Canceling", "Succeeded", "Failed", "Cancelled"]
            .into_iter()
            .map(RunStatus::parse)
            .filter(RunStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![RunStatus::Succeeded, RunStatus::Failed, RunStatus::Cancelled]
        );
    }

    #[test]
    fn unknown_status_is_not_terminal() {
        let status = RunStatus::parse("Succeeded ");
        assert!(!status.is_terminal());
        assert!(status.is_unrecognised());

        let lower = RunStatus::parse("succeeded");
        assert!(!lower.is_terminal());
    }

    #[test]
    fn only_succeeded_is_success() {
        assert!(RunStatus::Succeeded.is_success());
        assert!(!RunStatus::Failed.is_success());
        assert!(!RunStatus::Cancelled.is_success());
        assert!(!RunStatus::InProgress.is_success());
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&RunStatus::InProgress).unwrap();
        assert_eq!(json, r#""InProgress""#);
        let parsed: RunStatus = serde_json::from_str(r#""Deallocated""#).unwrap();
        assert_eq!(parsed, RunStatus::Other("Deallocated".into()));
    }

    #[test]
    fn empty_status_displays_placeholder() {
        assert_eq!(RunStatus::parse("").to_string(), "<none>");
        assert_eq!(RunStatus::Failed.to_string(), "Failed");
    }
}
