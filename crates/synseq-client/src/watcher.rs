//! Interval polling until a run is terminal.

use std::sync::Arc;

use async_trait::async_trait;
use synseq_core::{PollConfig, PollError, RequestError, RunId, RunOutcome, RunStatus, RunWatcher};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::SynapseClient;

/// [`RunWatcher`] that polls the run record over HTTP.
///
/// The first poll is immediate; later polls follow `interval`. A failed
/// status request ends the wait at once. Statuses outside the documented set
/// keep the watcher polling.
#[derive(Debug)]
pub struct HttpRunWatcher {
    client: Arc<SynapseClient>,
    poll: PollConfig,
}

impl HttpRunWatcher {
    /// Watcher over `client` with `poll` cadence.
    pub fn new(client: Arc<SynapseClient>, poll: PollConfig) -> Self {
        Self { client, poll }
    }
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl RunWatcher for HttpRunWatcher {
    #[tracing::instrument(skip_all, fields(run_id = %run_id))]
    async fn wait(
        &self,
        run_id: &RunId,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PollError> {
        let started = Instant::now();
        let max_wait = self.poll.max_wait();
        let mut last: Option<RunStatus> = None;
        let mut polls = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            let snapshot = self.client.get_run(run_id).await.map_err(|e| match e {
                RequestError::InvalidBody(body) => PollError::MalformedResponse {
                    run_id: run_id.clone(),
                    body,
                },
                source => PollError::Request {
                    run_id: run_id.clone(),
                    source,
                },
            })?;
            polls += 1;

            let status = snapshot.status;
            if last.as_ref() == Some(&status) {
                debug!(%status, polls, "run status unchanged");
            } else {
                info!(
                    from = %last.as_ref().map_or("-", RunStatus::as_str),
                    to = %status,
                    message = snapshot.message.as_deref().unwrap_or_default(),
                    polls,
                    "run status changed"
                );
            }
            if status.is_unrecognised() {
                warn!(%status, "unrecognised run status, continuing to poll");
            }

            if status.is_terminal() {
                return Ok(RunOutcome {
                    run_id: run_id.clone(),
                    status,
                    message: snapshot.message,
                    polls,
                    run_start: snapshot.run_start,
                    run_end: snapshot.run_end,
                    duration_ms: snapshot.duration_ms,
                });
            }

            let mut pause = self.poll.interval();
            if let Some(max_wait) = max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    warn!(%status, waited_ms = millis(waited), "gave up waiting for run");
                    return Err(PollError::TimedOut {
                        run_id: run_id.clone(),
                        waited_ms: millis(waited),
                        last_status: status,
                    });
                }
                // One last poll lands on the deadline.
                pause = pause.min(max_wait - waited);
            }
            last = Some(status);

            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                () = cancel.cancelled() => return Err(PollError::Cancelled),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use assert_matches::assert_matches;
    use std::time::Duration;
    use synseq_core::{AccessToken, AuthError, TokenProvider};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedToken;

    #[async_trait]
    impl TokenProvider for FixedToken {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn acquire(&self, _scope: &str) -> Result<AccessToken, AuthError> {
            Ok(AccessToken::new("tok", None))
        }
    }

    const RUN_PATH: &str = "/pipelineruns/run-1";

    fn watcher(server: &MockServer, poll: PollConfig) -> HttpRunWatcher {
        let client = SynapseClient::new(
            ClientConfig {
                base_url: server.uri(),
                api_version: "2020-12-01".into(),
                scope: "scope".into(),
                request_timeout: Duration::from_secs(5),
            },
            Arc::new(FixedToken),
        )
        .unwrap();
        HttpRunWatcher::new(Arc::new(client), poll)
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            interval_ms: 10,
            max_wait_ms: None,
        }
    }

    fn status_body(status: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "runId": "run-1",
            "status": status,
            "message": ""
        }))
    }

    async fn mount_sequence(server: &MockServer, statuses: &[(&str, u64)]) {
        for (status, times) in statuses {
            Mock::given(method("GET"))
                .and(path(RUN_PATH))
                .respond_with(status_body(status))
                .up_to_n_times(*times)
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn polls_until_succeeded() {
        let server = MockServer::start().await;
        mount_sequence(&server, &[("InProgress", 2), ("Succeeded", 1)]).await;

        let outcome = watcher(&server, fast_poll())
            .wait(&RunId::from("run-1"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Succeeded);
        assert_eq!(outcome.polls, 3);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn waits_one_interval_between_polls() {
        let server = MockServer::start().await;
        mount_sequence(&server, &[("InProgress", 2), ("Succeeded", 1)]).await;
        let interval = Duration::from_millis(60);

        let started = tokio::time::Instant::now();
        let outcome = watcher(
            &server,
            PollConfig {
                interval_ms: 60,
                max_wait_ms: None,
            },
        )
        .wait(&RunId::from("run-1"), &CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.polls, 3);
        assert!(
            started.elapsed() >= interval * 2,
            "three polls finished in {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn failed_is_terminal_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RUN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "runId": "run-1",
                "status": "Failed",
                "message": "Copy activity failed",
                "durationInMs": 1200
            })))
            .mount(&server)
            .await;

        let outcome = watcher(&server, fast_poll())
            .wait(&RunId::from("run-1"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.message.as_deref(), Some("Copy activity failed"));
        assert_eq!(outcome.duration_ms, Some(1200));
        assert_eq!(outcome.polls, 1);
    }

    #[tokio::test]
    async fn unknown_status_keeps_polling() {
        let server = MockServer::start().await;
        mount_sequence(
            &server,
            &[("Queued", 1), ("Deallocating", 2), ("Canceling", 1), ("Cancelled", 1)],
        )
        .await;

        let outcome = watcher(&server, fast_poll())
            .wait(&RunId::from("run-1"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Cancelled);
        assert_eq!(outcome.polls, 5);
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RUN_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .expect(1)
            .mount(&server)
            .await;

        let err = watcher(&server, fast_poll())
            .wait(&RunId::from("run-1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(
            err,
            PollError::Request { source: RequestError::Status { status: 500, .. }, .. }
        );
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RUN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = watcher(&server, fast_poll())
            .wait(&RunId::from("run-1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(err, PollError::MalformedResponse { ref body, .. } if body == "not json");
    }

    #[tokio::test]
    async fn max_wait_times_out_with_last_status() {
        let server = MockServer::start().await;
        mount_sequence(&server, &[("InProgress", u64::MAX)]).await;

        let poll = PollConfig {
            interval_ms: 20,
            max_wait_ms: Some(100),
        };
        let err = watcher(&server, poll)
            .wait(&RunId::from("run-1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(
            err,
            PollError::TimedOut { last_status: RunStatus::InProgress, waited_ms, .. } if waited_ms >= 100
        );
    }

    #[tokio::test]
    async fn cancellation_interrupts_interval() {
        let server = MockServer::start().await;
        mount_sequence(&server, &[("InProgress", u64::MAX)]).await;

        let poll = PollConfig {
            interval_ms: 60_000,
            max_wait_ms: None,
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let _ = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = watcher(&server, poll)
            .wait(&RunId::from("run-1"), &cancel)
            .await
            .unwrap_err();
        assert_matches!(err, PollError::Cancelled);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
