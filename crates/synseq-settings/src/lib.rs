//! # synseq-settings
//!
//! Static configuration for the pipeline sequencer, loaded once at process start.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SynseqSettings::default()`]
//! 2. **User file**: `~/.synseq/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SYNSEQ_*` and `AZURE_*` overrides (highest priority)
//!
//! There is no runtime reconfiguration: callers load once and pass the
//! value down.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_env_overrides_from, deep_merge, load_settings,
    load_required_settings, load_settings_from_path, read_settings_file, settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = SynseqSettings::default();
        let path = settings_path();
        assert!(path.ends_with(".synseq/settings.json"));
    }
}
