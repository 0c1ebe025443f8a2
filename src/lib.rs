//! Jump-scare page core
//!
//! Core modules:
//! - `timing`: Stage durations read live from the page's style configuration
//! - `schedule`: Deferred job facility (browser timers or a virtual clock)
//! - `countdown`: "are you ready? 3 2 1" announcement
//! - `sequence`: Effect timeline and the director that fires it
//! - `audio`: Two-tier scare audio with gesture-unlock recovery
//! - `particles`: Ambient dust simulation
//! - `ui`: Start/sound/mute/copy-link controls
//! - `web`: Browser implementations of the seams above (wasm only)

pub mod audio;
pub mod config;
pub mod countdown;
pub mod error;
pub mod particles;
pub mod schedule;
pub mod sequence;
pub mod timing;
pub mod ui;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::ScareConfig;
pub use error::{AudioError, ClipboardError, ConfigError};

/// Fixed timing constants
pub mod consts {
    /// Length of one countdown step (ms)
    pub const COUNTDOWN_STEP_MS: f64 = 1000.0;
    /// Monster reveal + scream offset from sequence start (ms)
    pub const MONSTER_OFFSET_MS: f64 = 120.0;
    /// Pause between the end of the blood stage and the CTA (ms)
    pub const CTA_TAIL_MS: f64 = 150.0;
    /// Scream fade-in length (ms) - long enough to kill the click
    pub const GAIN_RAMP_MS: f64 = 30.0;
    /// Starting gain for the fade-in (exponential-safe, not zero)
    pub const GAIN_FLOOR: f32 = 0.0001;
    /// Default dust population
    pub const PARTICLE_COUNT: usize = 48;
    /// How long the copy-link feedback stays visible (ms)
    pub const COPY_FEEDBACK_MS: f64 = 1800.0;
}
