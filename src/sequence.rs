//! The scare itself
//!
//! A run is a flat list of (offset, action) jobs handed to the scheduler in
//! one go. Later stages land after earlier ones only because their offsets
//! are sums of the same duration readings; nothing waits on anything else.

use std::rc::Rc;

use crate::config::ScareConfig;
use crate::schedule::Scheduler;
use crate::timing::{DurationSource, StageDurations};

/// One visual/audio state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectAction {
    EnableFlash,
    DisableFlash,
    EnableGlitch,
    DisableGlitch,
    EnableShake,
    DisableShake,
    RevealMonster,
    /// Fire the scream through the audio engine
    TriggerAudio,
    RevealBlood,
    /// Show the call-to-action (and drop any audio-unlock hint)
    RevealCta,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEntry {
    /// Milliseconds from sequence start
    pub offset_ms: f64,
    pub action: EffectAction,
}

/// Fixed parts of the timeline (everything not read from CSS)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineConstants {
    pub monster_offset_ms: f64,
    pub cta_tail_ms: f64,
}

impl Default for TimelineConstants {
    fn default() -> Self {
        Self {
            monster_offset_ms: crate::consts::MONSTER_OFFSET_MS,
            cta_tail_ms: crate::consts::CTA_TAIL_MS,
        }
    }
}

/// Offsets for one run, sorted by time (ties keep stage order)
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTimeline {
    entries: Vec<TimelineEntry>,
}

impl EffectTimeline {
    pub fn compute(d: &StageDurations, k: &TimelineConstants) -> Self {
        use EffectAction::*;

        let hold = d.hold_end();
        let total = hold + d.blood + k.cta_tail_ms;

        // Stage order: flash -> glitch/shake -> monster + audio -> blood -> CTA
        let mut entries: Vec<TimelineEntry> = [
            (0.0, EnableFlash),
            (d.flash, DisableFlash),
            (0.0, EnableGlitch),
            (0.0, EnableShake),
            (k.monster_offset_ms, RevealMonster),
            (k.monster_offset_ms, TriggerAudio),
            (d.shake, DisableShake),
            (d.glitch, DisableGlitch),
            (hold, RevealBlood),
            (total, RevealCta),
        ]
        .into_iter()
        .map(|(offset_ms, action)| TimelineEntry { offset_ms, action })
        .collect();

        // stable: equal offsets stay in stage order
        entries.sort_by(|a, b| a.offset_ms.total_cmp(&b.offset_ms));
        Self { entries }
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Offset of the first entry with this action
    pub fn offset_of(&self, action: EffectAction) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.action == action)
            .map(|e| e.offset_ms)
    }

    /// When the last job fires
    pub fn total_ms(&self) -> f64 {
        self.entries.last().map_or(0.0, |e| e.offset_ms)
    }
}

/// Where effect actions land (DOM classes, audio engine, vibration motor)
pub trait EffectSink {
    fn apply(&self, action: EffectAction);

    /// Buzz the device. Returns false when there is nothing to buzz.
    fn vibrate(&self, _pattern: &[u32]) -> bool {
        false
    }
}

pub struct SequenceDirector {
    constants: TimelineConstants,
    vibration_pattern: Vec<u32>,
}

impl SequenceDirector {
    pub fn new(constants: TimelineConstants, vibration_pattern: Vec<u32>) -> Self {
        Self {
            constants,
            vibration_pattern,
        }
    }

    pub fn from_config(config: &ScareConfig) -> Self {
        Self::new(
            TimelineConstants {
                monster_offset_ms: config.monster_offset_ms,
                cta_tail_ms: config.cta_tail_ms,
            },
            config.vibration_pattern.clone(),
        )
    }

    /// Timeline for the current duration readings
    pub fn timeline(&self, durations: &dyn DurationSource) -> EffectTimeline {
        EffectTimeline::compute(&StageDurations::read(durations), &self.constants)
    }

    /// Start a run: vibrate now, then submit every stage as its own job.
    ///
    /// Returns the timeline that was scheduled.
    pub fn run(
        &self,
        durations: &dyn DurationSource,
        scheduler: &dyn Scheduler,
        sink: Rc<dyn EffectSink>,
    ) -> EffectTimeline {
        if !self.vibration_pattern.is_empty() && !sink.vibrate(&self.vibration_pattern) {
            log::debug!("Vibration not available");
        }

        let timeline = self.timeline(durations);
        log::info!(
            "Scare sequence started ({} jobs over {:.0} ms)",
            timeline.entries().len(),
            timeline.total_ms()
        );

        for entry in timeline.entries() {
            let sink = sink.clone();
            let TimelineEntry { offset_ms, action } = *entry;
            scheduler.defer(
                offset_ms,
                Box::new(move || {
                    log::debug!("{:?} @ {} ms", action, offset_ms);
                    sink.apply(action);
                }),
            );
        }

        timeline
    }
}
