//! # synseq-runtime
//!
//! The fail-fast sequence state machine and the wiring that builds it from
//! settings.
//!
//! - [`SequenceOrchestrator`]: launch, wait, check, next
//! - [`run_from_settings`] / [`run_default`]: one-call entry points

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod orchestrator;

pub use bootstrap::{RuntimeError, build_orchestrator, run_default, run_from_settings};
pub use orchestrator::{
    JobRecord, SequenceEvent, SequenceOrchestrator, SequenceReport, SequenceState,
};
