//! # strata-settings
//!
//! Configuration for strata provider clients.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`StrataSettings::default()`]
//! 2. **User file**: `~/.strata/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: provider credentials and `STRATA_*` overrides
//!
//! There is no global instance. A process loads its settings once at startup
//! and hands a reference to the dispatcher; tests build a value directly.
//!
//! # Usage
//!
//! ```no_run
//! use strata_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("OpenAI endpoint: {}", settings.providers.openai.base_url);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
