//! Sidecar settings store for per-capture review state.
//!
//! Pause points and the trim range are not part of the capture file; they
//! live in a sidecar settings file keyed by capture identity (and optional
//! target alias). The store hands out shared handles to an element tree;
//! callers mutate attributes and children directly and the store flushes the
//! whole tree to disk atomically.
//!
//! Lifetime contract: [`SettingsStore::load_settings`] must run before any
//! [`SettingsStore::get_settings`] call for that capture, and
//! [`SettingsStore::unload_settings`] flushes and drops the tree when the
//! capture is closed.

mod element;
mod store;

use std::io;

pub use element::{ElementHandle, SettingsElement};
pub use store::SettingsStore;

pub(crate) use store::sanitize_file_stem;

/// Errors that can occur during sidecar settings operations.
///
/// A sidecar that exists but fails to parse is not an error: the store logs
/// it and starts from a fresh tree, per the degrade-to-nothing-persisted
/// policy.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading or writing the sidecar file failed.
    #[error("sidecar I/O error: {0}")]
    Io(#[from] io::Error),

    /// `get_settings`/`flush` called before `load_settings`.
    #[error("settings not loaded for capture '{0}'")]
    NotLoaded(String),
}

/// Result type for sidecar settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
