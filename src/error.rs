//! Error types
//!
//! Nothing here is fatal: every error ends in a degraded but complete run.

use thiserror::Error;

/// Failures along the scare-audio pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("audio context unavailable")]
    ContextUnavailable,

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("failed to resume audio context: {0}")]
    Resume(String),

    /// Platform autoplay policy wants a direct user gesture first
    #[error("playback blocked until the next user gesture")]
    PlaybackBlocked,

    #[error("playback failed: {0}")]
    Playback(String),
}

impl AudioError {
    /// Whether a second user gesture could make this play succeed
    pub fn needs_gesture(&self) -> bool {
        matches!(self, AudioError::PlaybackBlocked)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClipboardError {
    #[error("clipboard not available")]
    Unavailable,

    #[error("clipboard write rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config JSON")]
    Parse(#[from] serde_json::Error),

    #[error("countdown needs at least one step")]
    EmptyCountdown,

    #[error("{name} must be a finite, non-negative number of milliseconds (got {value})")]
    InvalidDuration { name: &'static str, value: f64 },
}
