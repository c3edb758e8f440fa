//! # synseq-client
//!
//! HTTP implementations of [`JobLauncher`](synseq_core::JobLauncher) and
//! [`RunWatcher`](synseq_core::RunWatcher) for the Synapse pipeline API.
//!
//! - [`SynapseClient`]: one request per call, classified errors, no retry
//! - [`HttpJobLauncher`]: fixed-delay retrying `createRun`
//! - [`HttpRunWatcher`]: interval polling of `pipelineruns/{runId}`

#![deny(unsafe_code)]

pub mod client;
pub mod launcher;
pub mod watcher;

pub use client::{ClientConfig, ClientError, RunSnapshot, SynapseClient};
pub use launcher::HttpJobLauncher;
pub use watcher::HttpRunWatcher;
