//! Core enums shared across modules.

use serde::{Deserialize, Serialize};

/// State of the live playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No playback session is active.
    #[default]
    Idle,
    /// Actively playing back.
    Playing,
    /// Paused mid-playback (e.g., at a pause point).
    Paused,
    /// Playback ran to the end or was stopped.
    Stopped,
}

impl PlaybackState {
    /// Whether the engine is at rest (idle, paused, or stopped).
    ///
    /// Range endpoints are editable exactly while the engine is at rest.
    pub fn is_resting(&self) -> bool {
        !matches!(self, PlaybackState::Playing)
    }
}
