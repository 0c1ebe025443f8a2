//! Scare tuning
//!
//! Read once at startup from an inline JSON block on the page. Nothing is
//! written back; every session starts from the page's own values.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Everything about the scare that is not a CSS stage duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScareConfig {
    // === Countdown ===
    /// Messages shown one per step
    pub countdown_steps: Vec<String>,
    /// Length of one countdown step (ms)
    pub countdown_step_ms: f64,

    // === Sequence ===
    /// Monster reveal + scream offset from sequence start (ms)
    pub monster_offset_ms: f64,
    /// Gap between the blood stage ending and the CTA appearing (ms)
    pub cta_tail_ms: f64,
    /// Vibration pattern fired at sequence start (ms on/off/on...)
    pub vibration_pattern: Vec<u32>,

    // === Audio ===
    /// Scare sound, fetched and decoded for the low-latency path
    pub scream_url: String,
    /// Peak gain of the scream (0.0 - 1.0)
    pub scream_volume: f32,
    /// Volume of the ambient suspense track (0.0 - 1.0)
    pub suspense_volume: f32,
    /// Scream fade-in length (ms)
    pub gain_ramp_ms: f64,

    // === Ambience ===
    /// Number of dust particles
    pub particle_count: usize,

    // === Controls ===
    /// How long copy-link feedback stays on screen (ms)
    pub copy_feedback_ms: f64,
}

impl Default for ScareConfig {
    fn default() -> Self {
        Self {
            countdown_steps: ["are you ready?", "3", "2", "1"]
                .into_iter()
                .map(String::from)
                .collect(),
            countdown_step_ms: COUNTDOWN_STEP_MS,

            monster_offset_ms: MONSTER_OFFSET_MS,
            cta_tail_ms: CTA_TAIL_MS,
            vibration_pattern: vec![10, 40, 15],

            scream_url: "audio/scream.mp3".to_string(),
            scream_volume: 1.0,
            suspense_volume: 0.6,
            gain_ramp_ms: GAIN_RAMP_MS,

            particle_count: PARTICLE_COUNT,

            copy_feedback_ms: COPY_FEEDBACK_MS,
        }
    }
}

impl ScareConfig {
    /// Parse and validate a JSON config block. Missing keys keep defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Clamp volumes and reject values that would break the timeline
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.countdown_steps.is_empty() {
            return Err(ConfigError::EmptyCountdown);
        }
        for (name, value) in [
            ("countdown_step_ms", self.countdown_step_ms),
            ("monster_offset_ms", self.monster_offset_ms),
            ("cta_tail_ms", self.cta_tail_ms),
            ("gain_ramp_ms", self.gain_ramp_ms),
            ("copy_feedback_ms", self.copy_feedback_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { name, value });
            }
        }
        self.scream_volume = self.scream_volume.clamp(0.0, 1.0);
        self.suspense_volume = self.suspense_volume.clamp(0.0, 1.0);
        Ok(self)
    }

    /// Id of the inline `<script type="application/json">` block
    #[cfg(target_arch = "wasm32")]
    const ELEMENT_ID: &'static str = "scare-config";

    /// Load config from the page (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let text = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(Self::ELEMENT_ID))
            .and_then(|el| el.text_content());

        if let Some(json) = text {
            match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded scare config from #{}", Self::ELEMENT_ID);
                    return config;
                }
                Err(e) => log::warn!("Ignoring invalid scare config: {}", e),
            }
        }

        log::info!("Using default scare config");
        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
