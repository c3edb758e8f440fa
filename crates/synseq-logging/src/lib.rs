//! # synseq-logging
//!
//! Structured logging with `tracing`.
//!
//! Every component logs through `tracing` macros with structured fields
//! (`job`, `run_id`, `status`, `sequence_id`). This crate only installs the
//! global subscriber: a `fmt` layer on stderr, compact or JSON, filtered by
//! `RUST_LOG` when set and by the configured level otherwise.

#![deny(unsafe_code)]

use tracing_subscriber::EnvFilter;

/// Build the level filter. `RUST_LOG` takes precedence over `level`.
///
/// An unparseable `level` falls back to `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber on stderr.
///
/// Call once at application startup. Subsequent calls are no-ops.
///
/// # Arguments
///
/// * `level` - Default filter directive, e.g. `"info"` or `"synseq_client=debug"`.
/// * `json` - Emit JSON lines instead of compact text.
pub fn init_subscriber(level: &str, json: bool) {
    let filter = build_filter(level);

    // try_init is a no-op if a global subscriber is already set
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    }
}
