//! # synseq-core
//!
//! Foundation types, errors, and service traits for the synseq pipeline sequencer.
//!
//! This crate provides the shared vocabulary that all other synseq crates depend on:
//!
//! - **Branded IDs**: `JobName`, `RunId`, `SequenceId` as newtypes for type safety
//! - **Run status**: [`RunStatus`] with terminal / non-terminal classification
//! - **Credentials**: [`AccessToken`] and the [`TokenProvider`] capability
//! - **Pipelines**: [`JobLauncher`] and [`RunWatcher`] traits consumed by the orchestrator
//! - **Errors**: `AuthError`, `LaunchError`, `PollError`, `JobFailedError` via `thiserror`
//! - **Policies**: fixed-delay [`RetryConfig`] and interval [`PollConfig`]

#![deny(unsafe_code)]

pub mod auth;
pub mod errors;
pub mod ids;
pub mod pipeline;
pub mod poll;
pub mod retry;
pub mod status;

pub use auth::{AccessToken, TokenProvider};
pub use errors::{
    AuthError, JobFailedError, LaunchError, PollError, RequestError, SequenceError,
};
pub use ids::{JobName, RunId, SequenceId};
pub use pipeline::{JobLauncher, JobParameters, RunOutcome, RunWatcher};
pub use poll::PollConfig;
pub use retry::RetryConfig;
pub use status::RunStatus;
