//! Page controls
//!
//! Start button, sound toggle, hard mute, copy-link. Each handler is a
//! direct reaction to one gesture.

use std::cell::Cell;
use std::rc::Rc;

use crate::audio::{AudioBackend, AudioPlaybackEngine, PlayOutcome};
use crate::config::ScareConfig;
use crate::countdown::{CountdownController, CountdownView};
use crate::error::ClipboardError;
use crate::schedule::Scheduler;
use crate::sequence::{EffectSink, SequenceDirector};
use crate::timing::DurationSource;

pub const COPY_OK: &str = "Link copied!";
pub const COPY_FAILED: &str = "Could not copy link";

/// Page event that spends a pending audio unlock. Must carry user
/// activation for touch as well as mouse; `pointerdown` does not on touch.
pub const UNLOCK_EVENT: &str = "click";

/// The control surface
pub trait ControlsView {
    fn set_start_enabled(&self, enabled: bool);
    /// Hide the intro panel
    fn hide_intro(&self);
    /// Drop focus from whatever was focused (the start button)
    fn blur_active(&self) {}
    /// Put focus on the start button
    fn focus_start(&self) {}
    fn show_sound_state(&self, enabled: bool, hard_muted: bool);
    /// Short-lived copy-link message; `None` clears it
    fn show_copy_feedback(&self, message: Option<&str>);
}

#[allow(async_fn_in_trait)]
pub trait Clipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// What the controller drives
pub struct UiParts<B: AudioBackend> {
    pub engine: Rc<AudioPlaybackEngine<B>>,
    pub scheduler: Rc<dyn Scheduler>,
    pub durations: Rc<dyn DurationSource>,
    pub controls: Rc<dyn ControlsView>,
    pub countdown_view: Rc<dyn CountdownView>,
    pub effects: Rc<dyn EffectSink>,
}

pub struct UiController<B: AudioBackend> {
    engine: Rc<AudioPlaybackEngine<B>>,
    scheduler: Rc<dyn Scheduler>,
    durations: Rc<dyn DurationSource>,
    controls: Rc<dyn ControlsView>,
    countdown_view: Rc<dyn CountdownView>,
    effects: Rc<dyn EffectSink>,
    countdown: CountdownController,
    director: Rc<SequenceDirector>,
    copy_feedback_ms: f64,
    started: Cell<bool>,
    /// Bumped per copy so an old clear-timeout can't wipe a newer message
    feedback_gen: Rc<Cell<u64>>,
}

impl<B: AudioBackend + 'static> UiController<B> {
    pub fn new(parts: UiParts<B>, config: &ScareConfig) -> Self {
        let UiParts {
            engine,
            scheduler,
            durations,
            controls,
            countdown_view,
            effects,
        } = parts;
        Self {
            engine,
            scheduler,
            durations,
            controls,
            countdown_view,
            effects,
            countdown: CountdownController::from_config(config),
            director: Rc::new(SequenceDirector::from_config(config)),
            copy_feedback_ms: config.copy_feedback_ms,
            started: Cell::new(false),
            feedback_gen: Rc::new(Cell::new(0)),
        }
    }

    pub fn engine(&self) -> &Rc<AudioPlaybackEngine<B>> {
        &self.engine
    }

    pub fn countdown(&self) -> &CountdownController {
        &self.countdown
    }

    /// Page loaded: focus the start button and sync the sound labels
    pub fn page_ready(&self) {
        self.controls.focus_start();
        self.sync_sound_state();
    }

    /// Start pressed: countdown, then the scare. Only the first press counts.
    pub fn start(&self) -> bool {
        if self.started.replace(true) {
            log::warn!("Start pressed again, ignoring");
            return false;
        }

        self.controls.set_start_enabled(false);
        self.controls.blur_active();
        self.controls.hide_intro();

        let director = self.director.clone();
        let durations = self.durations.clone();
        let scheduler = self.scheduler.clone();
        let effects = self.effects.clone();
        self.countdown.start(
            self.scheduler.clone(),
            self.countdown_view.clone(),
            move || {
                director.run(durations.as_ref(), scheduler.as_ref(), effects);
            },
        )
    }

    /// Sound toggle. Turning sound off also hard-mutes; turning it on un-mutes.
    pub fn toggle_sound(&self) -> bool {
        let enabled = !self.engine.enabled();
        self.engine.set_enabled(enabled);
        self.engine.set_hard_muted(!enabled);
        self.sync_sound_state();
        enabled
    }

    /// Mute button. Leaves the sound toggle alone.
    pub fn toggle_mute(&self) -> bool {
        let muted = !self.engine.hard_muted();
        self.engine.set_hard_muted(muted);
        self.sync_sound_state();
        muted
    }

    /// Copy `url` and flash a short confirmation (or failure) message
    pub async fn copy_link(
        &self,
        clipboard: &impl Clipboard,
        url: &str,
    ) -> Result<(), ClipboardError> {
        let result = clipboard.write_text(url).await;
        let message = match &result {
            Ok(()) => COPY_OK,
            Err(e) => {
                log::warn!("Copy link failed: {}", e);
                COPY_FAILED
            }
        };
        self.controls.show_copy_feedback(Some(message));

        let generation = self.feedback_gen.get() + 1;
        self.feedback_gen.set(generation);
        let current = self.feedback_gen.clone();
        let controls = self.controls.clone();
        self.scheduler.defer(
            self.copy_feedback_ms,
            Box::new(move || {
                if current.get() == generation {
                    controls.show_copy_feedback(None);
                }
            }),
        );
        result
    }

    /// Any tap on the page: spend the pending audio unlock, if there is one
    pub async fn page_tapped(&self) -> Option<PlayOutcome> {
        self.engine.retry_after_gesture().await
    }

    fn sync_sound_state(&self) {
        self.controls
            .show_sound_state(self.engine.enabled(), self.engine.hard_muted());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::FakeBackend;
    use crate::error::AudioError;
    use crate::schedule::ManualScheduler;
    use crate::sequence::EffectAction;
    use crate::timing::StyleMap;
    use pollster::block_on;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeControls {
        start_enabled: Cell<bool>,
        intro_hidden: Cell<bool>,
        blurred: Cell<u32>,
        focused: Cell<u32>,
        sound: Cell<Option<(bool, bool)>>,
        feedback: RefCell<Vec<Option<String>>>,
    }

    impl ControlsView for FakeControls {
        fn set_start_enabled(&self, enabled: bool) {
            self.start_enabled.set(enabled);
        }
        fn hide_intro(&self) {
            self.intro_hidden.set(true);
        }
        fn blur_active(&self) {
            self.blurred.set(self.blurred.get() + 1);
        }
        fn focus_start(&self) {
            self.focused.set(self.focused.get() + 1);
        }
        fn show_sound_state(&self, enabled: bool, hard_muted: bool) {
            self.sound.set(Some((enabled, hard_muted)));
        }
        fn show_copy_feedback(&self, message: Option<&str>) {
            self.feedback
                .borrow_mut()
                .push(message.map(str::to_string));
        }
    }

    struct NullCountdown;

    impl CountdownView for NullCountdown {
        fn show_step(&self, _text: &str) {}
        fn hide(&self) {}
    }

    struct TimedSink {
        clock: Rc<ManualScheduler>,
        fired: RefCell<Vec<(f64, EffectAction)>>,
    }

    impl EffectSink for TimedSink {
        fn apply(&self, action: EffectAction) {
            self.fired.borrow_mut().push((self.clock.now_ms(), action));
        }
    }

    struct FakeClipboard(Result<(), ClipboardError>);

    impl Clipboard for FakeClipboard {
        async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
            self.0.clone()
        }
    }

    struct Harness {
        sched: Rc<ManualScheduler>,
        controls: Rc<FakeControls>,
        sink: Rc<TimedSink>,
        ui: UiController<FakeBackend>,
    }

    fn harness() -> Harness {
        let config = ScareConfig::default();
        let sched = Rc::new(ManualScheduler::new());
        let controls = Rc::new(FakeControls::default());
        controls.start_enabled.set(true);
        let sink = Rc::new(TimedSink {
            clock: sched.clone(),
            fired: RefCell::new(Vec::new()),
        });
        let ui = UiController::new(
            UiParts {
                engine: Rc::new(AudioPlaybackEngine::new(FakeBackend::default(), &config)),
                scheduler: sched.clone(),
                durations: Rc::new(StyleMap::page_defaults()),
                controls: controls.clone(),
                countdown_view: Rc::new(NullCountdown),
                effects: sink.clone(),
            },
            &config,
        );
        Harness {
            sched,
            controls,
            sink,
            ui,
        }
    }

    #[test]
    fn test_start_runs_countdown_then_sequence() {
        let h = harness();
        assert!(h.ui.start());
        assert!(!h.controls.start_enabled.get());
        assert!(h.controls.intro_hidden.get());
        assert_eq!(h.controls.blurred.get(), 1);

        h.sched.advance(3999.0);
        assert!(h.sink.fired.borrow().is_empty());

        h.sched.run_until_idle();
        let fired = h.sink.fired.borrow();
        let at = |action| {
            fired
                .iter()
                .find(|(_, a)| *a == action)
                .map(|(t, _)| *t)
        };
        assert_eq!(at(EffectAction::EnableFlash), Some(4000.0));
        assert_eq!(at(EffectAction::TriggerAudio), Some(4120.0));
        assert_eq!(at(EffectAction::RevealCta), Some(5200.0));
    }

    #[test]
    fn test_second_start_ignored() {
        let h = harness();
        assert!(h.ui.start());
        assert!(!h.ui.start());
        h.sched.run_until_idle();
        let ctas = h
            .sink
            .fired
            .borrow()
            .iter()
            .filter(|(_, a)| *a == EffectAction::RevealCta)
            .count();
        assert_eq!(ctas, 1);
    }

    #[test]
    fn test_sound_toggle_forces_mute() {
        let h = harness();
        assert!(!h.ui.toggle_sound());
        assert!(!h.ui.engine().enabled());
        assert!(h.ui.engine().hard_muted());
        assert_eq!(h.controls.sound.get(), Some((false, true)));

        assert!(h.ui.toggle_sound());
        assert!(h.ui.engine().enabled());
        assert!(!h.ui.engine().hard_muted());
    }

    #[test]
    fn test_mute_leaves_enabled_alone() {
        let h = harness();
        assert!(h.ui.toggle_mute());
        assert!(h.ui.engine().enabled());
        assert!(h.ui.engine().hard_muted());
        assert_eq!(
            block_on(h.ui.engine().play_scream()),
            PlayOutcome::Muted
        );
        assert!(!h.ui.toggle_mute());
        assert!(!h.ui.engine().hard_muted());
    }

    #[test]
    fn test_copy_link_feedback_clears() {
        let h = harness();
        assert!(block_on(h.ui.copy_link(&FakeClipboard(Ok(())), "https://example.com/")).is_ok());
        assert_eq!(
            *h.controls.feedback.borrow(),
            vec![Some(COPY_OK.to_string())]
        );

        h.sched.advance(1800.0);
        assert_eq!(h.controls.feedback.borrow().last(), Some(&None));
    }

    #[test]
    fn test_copy_link_failure_message() {
        let h = harness();
        let result = block_on(
            h.ui.copy_link(&FakeClipboard(Err(ClipboardError::Unavailable)), "x"),
        );
        assert_eq!(result, Err(ClipboardError::Unavailable));
        assert_eq!(
            h.controls.feedback.borrow()[0].as_deref(),
            Some(COPY_FAILED)
        );
    }

    #[test]
    fn test_stale_clear_does_not_wipe_new_message() {
        let h = harness();
        block_on(h.ui.copy_link(&FakeClipboard(Ok(())), "a")).ok();
        h.sched.advance(1000.0);
        block_on(h.ui.copy_link(&FakeClipboard(Ok(())), "a")).ok();

        // first timeout fires at 1800: must not clear the second message
        h.sched.advance(900.0);
        assert_eq!(h.controls.feedback.borrow().len(), 2);

        h.sched.advance(1000.0);
        assert_eq!(h.controls.feedback.borrow().last(), Some(&None));
    }

    #[test]
    fn test_page_tap_spends_unlock() {
        let h = harness();
        // no buffer: scream goes through the media element, which is blocked
        *h.ui.engine().backend().decode_result.borrow_mut() =
            Err(AudioError::Decode("x".into()));
        block_on(h.ui.engine().initialize());
        h.ui
            .engine()
            .backend()
            .queue_media(Err(AudioError::PlaybackBlocked));
        block_on(h.ui.engine().play_scream());

        assert!(h.ui.engine().needs_second_gesture());
        assert!(block_on(h.ui.page_tapped()).is_some());
        assert!(!h.ui.engine().needs_second_gesture());
        assert_eq!(block_on(h.ui.page_tapped()), None);
    }

    #[test]
    fn test_unlock_listens_for_activating_event() {
        // events that grant user activation for every pointer type
        assert!(["click", "pointerup", "touchend", "keydown"].contains(&UNLOCK_EVENT));
    }

    #[test]
    fn test_page_ready_focuses_start() {
        let h = harness();
        h.ui.page_ready();
        assert_eq!(h.controls.focused.get(), 1);
        assert_eq!(h.controls.sound.get(), Some((true, false)));
    }
}
