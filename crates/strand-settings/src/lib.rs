//! # strand-settings
//!
//! Layered process-wide defaults for strand pipelines and agents.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`StrandSettings::default()`]
//! 2. **User file**: `~/.strand/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `STRAND_*` overrides (highest priority)
//!
//! These are defaults only. A single call is configured through
//! `strand_core::RunConfig`, whose builder reads from [`get_settings`]
//! once, before dispatch.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::Arc;

use parking_lot::RwLock;

/// Global settings singleton.
///
/// Reads take a shared lock and clone the `Arc`, so callers hold a
/// consistent snapshot even if [`init_settings`] swaps the value.
static SETTINGS: RwLock<Option<Arc<StrandSettings>>> = parking_lot::const_rwlock(None);

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.strand/settings.json` with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> Arc<StrandSettings> {
    {
        let guard = SETTINGS.read();
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write();
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            StrandSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialize the global settings with a specific value.
///
/// Replaces any previously cached settings.
pub fn init_settings(mut settings: StrandSettings) {
    settings.validate();
    *SETTINGS.write() = Some(Arc::new(settings));
}

#[cfg(test)]
pub(crate) fn reset_settings() {
    *SETTINGS.write() = None;
}
