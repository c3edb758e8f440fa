//! Sequential fail-fast execution of the configured job list.
//!
//! ```text
//! Pending{0} ─▶ Running{0} ─ok─▶ Pending{1} ─▶ Running{1} ─ok─▶ … ─ok─▶ Completed
//!                   │                              │
//!                   └────────── any error ─────────┴──────────────────▶ Aborted{i, status}
//! ```
//!
//! Job `i + 1` is never launched before job `i` is observed `Succeeded`. The
//! first launch failure, poll failure, or non-success terminal status aborts
//! the sequence; already finished jobs are not compensated.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use synseq_core::{
    JobFailedError, JobLauncher, JobName, LaunchError, PollError, RunId, RunStatus, RunWatcher,
    SequenceError, SequenceId,
};
use synseq_settings::PipelineSpec;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

// ─────────────────────────────────────────────────────────────────────────────
// State, records, events
// ─────────────────────────────────────────────────────────────────────────────

/// Where a sequence is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SequenceState {
    /// Job `index` is next.
    Pending {
        /// Position in the job list.
        index: usize,
    },
    /// Job `index` is being launched or watched.
    Running {
        /// Position in the job list.
        index: usize,
    },
    /// Stopped at job `index`. Later jobs were not started.
    Aborted {
        /// Position of the job that failed.
        index: usize,
        /// Last status observed for its run, if it got that far.
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<RunStatus>,
    },
    /// Every job succeeded.
    Completed,
}

impl SequenceState {
    /// Whether no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::Completed)
    }

    /// State after job `index` of `len` succeeded.
    fn advance(index: usize, len: usize) -> Self {
        if index + 1 >= len {
            Self::Completed
        } else {
            Self::Pending { index: index + 1 }
        }
    }
}

/// Status the failure observed, when a run got far enough to report one.
fn observed_status(err: &SequenceError) -> Option<RunStatus> {
    match err {
        SequenceError::JobFailed(e) => Some(e.status.clone()),
        SequenceError::Poll {
            source: PollError::TimedOut { last_status, .. },
            ..
        } => Some(last_status.clone()),
        _ => None,
    }
}

/// Result of one finished job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Job name.
    pub job: JobName,
    /// Run it produced.
    pub run_id: RunId,
    /// Terminal status.
    pub status: RunStatus,
    /// Service message, if any.
    pub message: Option<String>,
    /// Launch plus wait, in milliseconds.
    pub elapsed_ms: u64,
}

/// Summary of a completed sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceReport {
    /// Invocation identifier.
    pub sequence_id: SequenceId,
    /// One record per job, in order.
    pub jobs: Vec<JobRecord>,
    /// Always [`SequenceState::Completed`] for a returned report.
    pub state: SequenceState,
}

/// Progress notifications for observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequenceEvent {
    /// The sequence began.
    Started {
        /// Invocation identifier.
        sequence_id: SequenceId,
        /// Number of jobs to run.
        jobs: usize,
    },
    /// A job was submitted.
    JobLaunched {
        /// Invocation identifier.
        sequence_id: SequenceId,
        /// Position in the job list.
        index: usize,
        /// Job name.
        job: JobName,
        /// Run it produced.
        run_id: RunId,
    },
    /// A job reached a terminal status.
    JobFinished {
        /// Invocation identifier.
        sequence_id: SequenceId,
        /// Position in the job list.
        index: usize,
        /// Job name.
        job: JobName,
        /// Its run.
        run_id: RunId,
        /// Terminal status.
        status: RunStatus,
    },
    /// The sequence stopped early.
    Aborted {
        /// Invocation identifier.
        sequence_id: SequenceId,
        /// Position of the failing job.
        index: usize,
        /// Failing job.
        job: JobName,
        /// Rendered error.
        reason: String,
    },
    /// Every job succeeded.
    Completed {
        /// Invocation identifier.
        sequence_id: SequenceId,
        /// Number of jobs run.
        jobs: usize,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// Runs a fixed job list one at a time, stopping at the first failure.
pub struct SequenceOrchestrator {
    jobs: Vec<PipelineSpec>,
    launcher: Arc<dyn JobLauncher>,
    watcher: Arc<dyn RunWatcher>,
    events: Option<broadcast::Sender<SequenceEvent>>,
}

impl SequenceOrchestrator {
    /// Orchestrator for `jobs` in order.
    pub fn new(
        jobs: Vec<PipelineSpec>,
        launcher: Arc<dyn JobLauncher>,
        watcher: Arc<dyn RunWatcher>,
    ) -> Self {
        Self {
            jobs,
            launcher,
            watcher,
            events: None,
        }
    }

    /// Publish [`SequenceEvent`]s on `tx`.
    #[must_use]
    pub fn with_events(mut self, tx: broadcast::Sender<SequenceEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Jobs in execution order.
    pub fn jobs(&self) -> &[PipelineSpec] {
        &self.jobs
    }

    fn emit(&self, event: SequenceEvent) {
        if let Some(tx) = &self.events {
            // No subscribers is fine.
            let _ = tx.send(event);
        }
    }

    /// Run every job in order.
    ///
    /// Cancellation stops the local wait only; a run already submitted keeps
    /// going on the service.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SequenceReport, SequenceError> {
        let sequence_id = SequenceId::new();
        let span = info_span!("sequence", %sequence_id, jobs = self.jobs.len());
        self.run_inner(sequence_id, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        sequence_id: SequenceId,
        cancel: &CancellationToken,
    ) -> Result<SequenceReport, SequenceError> {
        let len = self.jobs.len();
        let mut state = if len == 0 {
            SequenceState::Completed
        } else {
            SequenceState::Pending { index: 0 }
        };
        let mut records = Vec::with_capacity(len);

        info!(?state, "starting pipeline sequence");
        self.emit(SequenceEvent::Started {
            sequence_id: sequence_id.clone(),
            jobs: len,
        });

        while let SequenceState::Pending { index } = state {
            let spec = &self.jobs[index];
            state = SequenceState::Running { index };
            info!(?state, job = %spec.name, "running pipeline");

            match self.run_job(&sequence_id, index, spec, cancel).await {
                Ok(record) => {
                    records.push(record);
                    state = SequenceState::advance(index, len);
                }
                Err(err) => {
                    state = SequenceState::Aborted {
                        index,
                        status: observed_status(&err),
                    };
                    error!(
                        ?state,
                        job = %err.job(),
                        kind = err.kind(),
                        error = %err,
                        "pipeline sequence aborted"
                    );
                    self.emit(SequenceEvent::Aborted {
                        sequence_id,
                        index,
                        job: err.job().clone(),
                        reason: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }

        info!(?state, jobs = records.len(), "all pipelines succeeded");
        self.emit(SequenceEvent::Completed {
            sequence_id: sequence_id.clone(),
            jobs: records.len(),
        });

        Ok(SequenceReport {
            sequence_id,
            jobs: records,
            state,
        })
    }

    async fn run_job(
        &self,
        sequence_id: &SequenceId,
        index: usize,
        spec: &PipelineSpec,
        cancel: &CancellationToken,
    ) -> Result<JobRecord, SequenceError> {
        let job = &spec.name;
        if cancel.is_cancelled() {
            return Err(SequenceError::Cancelled { job: job.clone() });
        }
        let started = Instant::now();

        let run_id = self
            .launcher
            .launch(job, &spec.parameters, cancel)
            .await
            .map_err(|source| match source {
                LaunchError::Cancelled => SequenceError::Cancelled { job: job.clone() },
                source => SequenceError::Launch {
                    job: job.clone(),
                    source,
                },
            })?;
        self.emit(SequenceEvent::JobLaunched {
            sequence_id: sequence_id.clone(),
            index,
            job: job.clone(),
            run_id: run_id.clone(),
        });

        let outcome = self
            .watcher
            .wait(&run_id, cancel)
            .await
            .map_err(|source| match source {
                PollError::Cancelled => SequenceError::Cancelled { job: job.clone() },
                source => SequenceError::Poll {
                    job: job.clone(),
                    source,
                },
            })?;
        self.emit(SequenceEvent::JobFinished {
            sequence_id: sequence_id.clone(),
            index,
            job: job.clone(),
            run_id: run_id.clone(),
            status: outcome.status.clone(),
        });

        if !outcome.status.is_success() {
            return Err(JobFailedError {
                job: job.clone(),
                run_id,
                status: outcome.status,
                message: outcome.message,
            }
            .into());
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(job = %job, %run_id, elapsed_ms, polls = outcome.polls, "pipeline succeeded");
        Ok(JobRecord {
            job: job.clone(),
            run_id,
            status: outcome.status,
            message: outcome.message,
            elapsed_ms,
        })
    }
}

impl std::fmt::Debug for SequenceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceOrchestrator")
            .field("jobs", &self.jobs.len())
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use synseq_core::{JobParameters, RequestError, RunOutcome};

    /// Issues `run-<job>` ids, failing for jobs listed in `failures`.
    #[derive(Default)]
    struct ScriptedLauncher {
        failures: HashMap<String, LaunchError>,
        launched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobLauncher for ScriptedLauncher {
        async fn launch(
            &self,
            job: &JobName,
            _parameters: &JobParameters,
            _cancel: &CancellationToken,
        ) -> Result<RunId, LaunchError> {
            self.launched.lock().unwrap().push(job.to_string());
            match self.failures.get(job.as_str()) {
                Some(err) => Err(err.clone()),
                None => Ok(RunId::from(format!("run-{job}"))),
            }
        }
    }

    /// Returns a fixed result per run id, `Succeeded` otherwise.
    #[derive(Default)]
    struct ScriptedWatcher {
        results: HashMap<String, Result<RunOutcome, PollError>>,
        watched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RunWatcher for ScriptedWatcher {
        async fn wait(
            &self,
            run_id: &RunId,
            _cancel: &CancellationToken,
        ) -> Result<RunOutcome, PollError> {
            self.watched.lock().unwrap().push(run_id.to_string());
            self.results
                .get(run_id.as_str())
                .cloned()
                .unwrap_or_else(|| Ok(RunOutcome::new(run_id.clone(), RunStatus::Succeeded)))
        }
    }

    fn jobs(names: &[&str]) -> Vec<PipelineSpec> {
        names.iter().map(|n| PipelineSpec::named(*n)).collect()
    }

    fn orchestrator(
        names: &[&str],
        launcher: Arc<ScriptedLauncher>,
        watcher: Arc<ScriptedWatcher>,
    ) -> SequenceOrchestrator {
        SequenceOrchestrator::new(jobs(names), launcher, watcher)
    }

    fn drain(rx: &mut broadcast::Receiver<SequenceEvent>) -> Vec<SequenceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn all_succeed_in_order() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let watcher = Arc::new(ScriptedWatcher::default());
        let (tx, mut rx) = broadcast::channel(32);
        let orch = orchestrator(&["A", "B", "C"], launcher.clone(), watcher.clone()).with_events(tx);

        let report = orch.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.state, SequenceState::Completed);
        let names: Vec<_> = report.jobs.iter().map(|r| r.job.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(report.jobs[1].run_id.as_str(), "run-B");
        assert_eq!(*launcher.launched.lock().unwrap(), ["A", "B", "C"]);
        assert_eq!(*watcher.watched.lock().unwrap(), ["run-A", "run-B", "run-C"]);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1 + 3 * 2 + 1);
        assert_matches!(&events[0], SequenceEvent::Started { jobs: 3, .. });
        assert_matches!(&events[1], SequenceEvent::JobLaunched { index: 0, job, .. } if job.as_str() == "A");
        assert_matches!(&events[2], SequenceEvent::JobFinished { index: 0, status: RunStatus::Succeeded, .. });
        assert_matches!(events.last(), Some(SequenceEvent::Completed { jobs: 3, .. }));
    }

    #[tokio::test]
    async fn rerun_launches_every_job_again() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let watcher = Arc::new(ScriptedWatcher::default());
        let orch = orchestrator(&["A", "B"], launcher.clone(), watcher.clone());

        let first = orch.run(&CancellationToken::new()).await.unwrap();
        let second = orch.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(first.state, SequenceState::Completed);
        assert_eq!(second.state, SequenceState::Completed);
        assert_ne!(first.sequence_id, second.sequence_id);
        assert_eq!(second.jobs.len(), 2);
        assert_eq!(*launcher.launched.lock().unwrap(), ["A", "B", "A", "B"]);
        assert_eq!(
            *watcher.watched.lock().unwrap(),
            ["run-A", "run-B", "run-A", "run-B"]
        );
    }

    #[tokio::test]
    async fn failed_job_stops_the_sequence() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let mut watcher = ScriptedWatcher::default();
        let mut outcome = RunOutcome::new(RunId::from("run-B"), RunStatus::Failed);
        outcome.message = Some("Copy activity failed".into());
        let _ = watcher.results.insert("run-B".into(), Ok(outcome));
        let watcher = Arc::new(watcher);
        let (tx, mut rx) = broadcast::channel(32);
        let orch = orchestrator(&["A", "B", "C"], launcher.clone(), watcher).with_events(tx);

        let err = orch.run(&CancellationToken::new()).await.unwrap_err();

        assert_matches!(
            &err,
            SequenceError::JobFailed(JobFailedError { job, status: RunStatus::Failed, message: Some(m), .. })
                if job.as_str() == "B" && m == "Copy activity failed"
        );
        assert_eq!(err.job().as_str(), "B");
        assert_eq!(*launcher.launched.lock().unwrap(), ["A", "B"]);

        let events = drain(&mut rx);
        assert_matches!(events.last(), Some(SequenceEvent::Aborted { index: 1, job, .. }) if job.as_str() == "B");
    }

    #[tokio::test]
    async fn cancelled_run_status_aborts() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let mut watcher = ScriptedWatcher::default();
        let _ = watcher.results.insert(
            "run-A".into(),
            Ok(RunOutcome::new(RunId::from("run-A"), RunStatus::Cancelled)),
        );
        let orch = orchestrator(&["A", "B"], launcher.clone(), Arc::new(watcher));

        let err = orch.run(&CancellationToken::new()).await.unwrap_err();
        assert_matches!(err, SequenceError::JobFailed(JobFailedError { status: RunStatus::Cancelled, .. }));
        assert_eq!(*launcher.launched.lock().unwrap(), ["A"]);
    }

    #[tokio::test]
    async fn launch_failure_skips_watch() {
        let mut launcher = ScriptedLauncher::default();
        let _ = launcher.failures.insert(
            "A".into(),
            LaunchError::Exhausted {
                job: JobName::from("A"),
                attempts: 3,
                last: RequestError::Transport("connection refused".into()),
            },
        );
        let watcher = Arc::new(ScriptedWatcher::default());
        let orch = orchestrator(&["A", "B"], Arc::new(launcher), watcher.clone());

        let err = orch.run(&CancellationToken::new()).await.unwrap_err();
        assert_matches!(
            err,
            SequenceError::Launch { ref job, source: LaunchError::Exhausted { attempts: 3, .. } } if job.as_str() == "A"
        );
        assert!(watcher.watched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn poll_failure_aborts() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let mut watcher = ScriptedWatcher::default();
        let _ = watcher.results.insert(
            "run-A".into(),
            Err(PollError::Request {
                run_id: RunId::from("run-A"),
                source: RequestError::Transport("reset".into()),
            }),
        );
        let orch = orchestrator(&["A", "B"], launcher.clone(), Arc::new(watcher));

        let err = orch.run(&CancellationToken::new()).await.unwrap_err();
        assert_matches!(err, SequenceError::Poll { .. });
        assert_eq!(err.kind(), "poll");
        assert_eq!(*launcher.launched.lock().unwrap(), ["A"]);
    }

    #[tokio::test]
    async fn empty_list_completes_immediately() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let orch = orchestrator(&[], launcher.clone(), Arc::new(ScriptedWatcher::default()));

        let report = orch.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.state, SequenceState::Completed);
        assert!(report.jobs.is_empty());
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_start_launches_nothing() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let orch = orchestrator(&["A", "B"], launcher.clone(), Arc::new(ScriptedWatcher::default()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orch.run(&cancel).await.unwrap_err();
        assert_matches!(err, SequenceError::Cancelled { ref job } if job.as_str() == "A");
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn watcher_cancellation_is_sequence_cancellation() {
        let launcher = Arc::new(ScriptedLauncher::default());
        let mut watcher = ScriptedWatcher::default();
        let _ = watcher.results.insert("run-A".into(), Err(PollError::Cancelled));
        let orch = orchestrator(&["A"], launcher, Arc::new(watcher));

        let err = orch.run(&CancellationToken::new()).await.unwrap_err();
        assert_matches!(err, SequenceError::Cancelled { .. });
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SequenceEvent::JobFinished {
            sequence_id: SequenceId::from("seq"),
            index: 2,
            job: JobName::from("A"),
            run_id: RunId::from("r"),
            status: RunStatus::Succeeded,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "job_finished");
        assert_eq!(json["status"], "Succeeded");

        let state = serde_json::to_value(SequenceState::Aborted {
            index: 1,
            status: Some(RunStatus::Failed),
        })
        .unwrap();
        assert_eq!(
            state,
            serde_json::json!({"state": "aborted", "index": 1, "status": "Failed"})
        );
    }

    #[test]
    fn advance_walks_to_completion() {
        assert_eq!(SequenceState::advance(0, 3), SequenceState::Pending { index: 1 });
        assert_eq!(SequenceState::advance(2, 3), SequenceState::Completed);
        assert!(SequenceState::Completed.is_terminal());
        assert!(!SequenceState::Pending { index: 0 }.is_terminal());
    }
}
