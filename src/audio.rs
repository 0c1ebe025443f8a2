//! Scare audio
//!
//! Two ways to make noise:
//! - Primary: a pre-decoded buffer through the mixing graph, faded in over
//!   a few ms so it doesn't click
//! - Fallback: a plain media element, used when the buffer never loaded
//!
//! Autoplay policy can reject the fallback. When it does, the engine raises
//! a "tap again" hint and the next tap on the page retries once.

use std::cell::{Cell, RefCell};

use crate::config::ScareConfig;
use crate::consts::GAIN_FLOOR;
use crate::error::AudioError;

/// State of the platform audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// Typically until the first user gesture
    Suspended,
    Closed,
    /// No context could be created at all
    Unavailable,
}

/// The two media-element tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTrack {
    /// Fallback scare sound
    Scream,
    /// Ambient track under the countdown
    Suspense,
}

/// Which path produced sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPath {
    Primary,
    Fallback,
}

/// Result of a play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Played(PlaybackPath),
    /// Sound is off or hard-muted; nothing was touched
    Muted,
    /// Platform wants a direct user gesture first
    BlockedNeedsGesture,
    /// No playable source
    AssetUnavailable,
}

/// Snapshot of the engine's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioState {
    pub enabled: bool,
    pub hard_muted: bool,
    pub engine_ready: bool,
    pub buffer_loaded: bool,
    pub needs_second_gesture: bool,
}

/// Platform side of the audio pipeline.
///
/// Gain methods act on the single shared gain node; times are on the audio
/// clock, in seconds.
#[allow(async_fn_in_trait)]
pub trait AudioBackend {
    /// Raw fetched asset
    type Bytes;
    /// Decoded, playable buffer
    type Buffer: Clone;

    fn context_state(&self) -> ContextState;
    async fn resume(&self) -> Result<(), AudioError>;
    async fn fetch(&self, url: &str) -> Result<Self::Bytes, AudioError>;
    async fn decode(&self, bytes: Self::Bytes) -> Result<Self::Buffer, AudioError>;

    fn current_time(&self) -> f64;
    /// Drop every gain automation event at or after `from`
    fn cancel_gain_ramps(&self, from: f64);
    fn set_gain_at(&self, value: f32, at: f64);
    fn ramp_gain_to(&self, value: f32, at: f64);
    /// Start a one-shot source for `buffer` through the gain node, now
    fn start_buffer(&self, buffer: &Self::Buffer) -> Result<(), AudioError>;

    /// Rewind `track`, set its volume and play it
    async fn play_media(&self, track: MediaTrack, volume: f32) -> Result<(), AudioError>;
    /// Pause and rewind `track`
    fn stop_media(&self, track: MediaTrack);

    /// Show/hide the "tap to enable sound" hint
    fn set_unlock_hint(&self, visible: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Idle,
    Loading,
    Loaded,
    /// Fetch or decode failed; fallback only for the rest of the session
    Failed,
}

/// Audio engine for the scare.
///
/// Shared behind an `Rc`; all methods take `&self` and no borrow is held
/// across an await.
pub struct AudioPlaybackEngine<B: AudioBackend> {
    backend: B,
    scream_url: String,
    scream_volume: f32,
    suspense_volume: f32,
    /// Fade-in length (seconds)
    ramp_secs: f64,
    enabled: Cell<bool>,
    hard_muted: Cell<bool>,
    needs_second_gesture: Cell<bool>,
    load: Cell<LoadState>,
    buffer: RefCell<Option<B::Buffer>>,
}

impl<B: AudioBackend> AudioPlaybackEngine<B> {
    pub fn new(backend: B, config: &ScareConfig) -> Self {
        Self {
            backend,
            scream_url: config.scream_url.clone(),
            scream_volume: config.scream_volume,
            suspense_volume: config.suspense_volume,
            ramp_secs: config.gain_ramp_ms / 1000.0,
            enabled: Cell::new(true),
            hard_muted: Cell::new(false),
            needs_second_gesture: Cell::new(false),
            load: Cell::new(LoadState::Idle),
            buffer: RefCell::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // === Flags ===

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn hard_muted(&self) -> bool {
        self.hard_muted.get()
    }

    pub fn needs_second_gesture(&self) -> bool {
        self.needs_second_gesture.get()
    }

    /// Both switches are in the "sound on" position
    pub fn is_audible(&self) -> bool {
        self.enabled.get() && !self.hard_muted.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
        log::info!("Sound {}", if enabled { "enabled" } else { "disabled" });
        if !self.is_audible() {
            self.stop_suspense();
        }
    }

    pub fn set_hard_muted(&self, muted: bool) {
        self.hard_muted.set(muted);
        log::info!("Hard mute {}", if muted { "on" } else { "off" });
        if !self.is_audible() {
            self.stop_suspense();
        }
    }

    pub fn state(&self) -> AudioState {
        AudioState {
            enabled: self.enabled.get(),
            hard_muted: self.hard_muted.get(),
            engine_ready: matches!(
                self.backend.context_state(),
                ContextState::Running | ContextState::Suspended
            ),
            buffer_loaded: self.buffer.borrow().is_some(),
            needs_second_gesture: self.needs_second_gesture.get(),
        }
    }

    // === Loading ===

    /// Fetch and decode the scare sound. Safe to call more than once: only
    /// the first call does any work, later ones report the outcome.
    ///
    /// Returns whether the low-latency path is available.
    pub async fn initialize(&self) -> bool {
        match self.load.get() {
            LoadState::Idle => {}
            LoadState::Loaded => return true,
            LoadState::Loading | LoadState::Failed => return false,
        }

        if self.backend.context_state() == ContextState::Unavailable {
            log::warn!("No audio context - scream will use the media element");
            self.load.set(LoadState::Failed);
            return false;
        }

        self.load.set(LoadState::Loading);
        match self.load_buffer().await {
            Ok(buffer) => {
                *self.buffer.borrow_mut() = Some(buffer);
                self.load.set(LoadState::Loaded);
                log::info!("Scream decoded from {}", self.scream_url);
                true
            }
            Err(e) => {
                log::warn!("{} - scream will use the media element", e);
                self.load.set(LoadState::Failed);
                false
            }
        }
    }

    /// Resume a suspended context while we are inside a user gesture, so
    /// the scream later on does not have to. Failure is only logged.
    pub async fn prime(&self) {
        if self.backend.context_state() != ContextState::Suspended {
            return;
        }
        match self.backend.resume().await {
            Ok(()) => log::info!("Audio context resumed"),
            Err(e) => log::warn!("{}", e),
        }
    }

    async fn load_buffer(&self) -> Result<B::Buffer, AudioError> {
        let bytes = self.backend.fetch(&self.scream_url).await?;
        self.backend.decode(bytes).await
    }

    // === Playback ===

    /// Play the scare sound (silently does nothing while muted)
    pub async fn play_scream(&self) -> PlayOutcome {
        if !self.is_audible() {
            log::debug!("Scream skipped (muted)");
            return PlayOutcome::Muted;
        }

        self.stop_suspense();

        let buffer = self.buffer.borrow().clone();
        if let Some(buffer) = buffer {
            match self.play_primary(&buffer).await {
                Ok(()) => {
                    self.mark_played();
                    return PlayOutcome::Played(PlaybackPath::Primary);
                }
                Err(e) => log::warn!("Buffered scream failed ({}), using media element", e),
            }
        }

        match self
            .backend
            .play_media(MediaTrack::Scream, self.scream_volume)
            .await
        {
            Ok(()) => {
                self.mark_played();
                PlayOutcome::Played(PlaybackPath::Fallback)
            }
            Err(e) if e.needs_gesture() => {
                log::warn!("Scream blocked by autoplay policy, waiting for a tap");
                self.needs_second_gesture.set(true);
                self.backend.set_unlock_hint(true);
                PlayOutcome::BlockedNeedsGesture
            }
            Err(e) => {
                log::warn!("Scream unavailable: {}", e);
                PlayOutcome::AssetUnavailable
            }
        }
    }

    async fn play_primary(&self, buffer: &B::Buffer) -> Result<(), AudioError> {
        match self.backend.context_state() {
            ContextState::Running => {}
            ContextState::Suspended => {
                if let Err(e) = self.backend.resume().await {
                    log::warn!("{}", e);
                }
            }
            ContextState::Closed | ContextState::Unavailable => {
                return Err(AudioError::ContextUnavailable);
            }
        }

        // One envelope at a time on the shared gain node
        let now = self.backend.current_time();
        self.backend.cancel_gain_ramps(now);
        self.backend.set_gain_at(GAIN_FLOOR, now);
        self.backend
            .ramp_gain_to(self.scream_volume, now + self.ramp_secs);
        self.backend.start_buffer(buffer)
    }

    /// The one retry after a blocked scream. Call from the next user tap.
    ///
    /// Clears the pending flag and the hint whatever happens; a second
    /// rejection does not re-arm them. Returns `None` if nothing was pending.
    pub async fn retry_after_gesture(&self) -> Option<PlayOutcome> {
        if !self.needs_second_gesture.replace(false) {
            return None;
        }
        self.backend.set_unlock_hint(false);

        if !self.is_audible() {
            return Some(PlayOutcome::Muted);
        }

        let outcome = match self
            .backend
            .play_media(MediaTrack::Scream, self.scream_volume)
            .await
        {
            Ok(()) => PlayOutcome::Played(PlaybackPath::Fallback),
            Err(e) if e.needs_gesture() => {
                log::warn!("Scream still blocked after tap, giving up");
                PlayOutcome::BlockedNeedsGesture
            }
            Err(e) => {
                log::warn!("Scream retry failed: {}", e);
                PlayOutcome::AssetUnavailable
            }
        };
        Some(outcome)
    }

    /// Drop a pending unlock without playing anything; hides the hint.
    /// Used once the scare is over and a late scream would be out of place.
    pub fn dismiss_unlock_hint(&self) {
        if self.needs_second_gesture.replace(false) {
            log::debug!("Pending unlock dismissed");
        }
        self.backend.set_unlock_hint(false);
    }

    /// Ambient track under the countdown. Failures are only logged.
    pub async fn play_suspense(&self) -> PlayOutcome {
        if !self.is_audible() {
            return PlayOutcome::Muted;
        }
        match self
            .backend
            .play_media(MediaTrack::Suspense, self.suspense_volume)
            .await
        {
            Ok(()) => PlayOutcome::Played(PlaybackPath::Fallback),
            Err(e) => {
                log::warn!("Suspense track did not start: {}", e);
                if e.needs_gesture() {
                    PlayOutcome::BlockedNeedsGesture
                } else {
                    PlayOutcome::AssetUnavailable
                }
            }
        }
    }

    pub fn stop_suspense(&self) {
        self.backend.stop_media(MediaTrack::Suspense);
    }

    fn mark_played(&self) {
        if self.needs_second_gesture.replace(false) {
            self.backend.set_unlock_hint(false);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Call, FakeBackend, GainEvent};
    use super::*;
    use pollster::block_on;

    fn engine(backend: FakeBackend) -> AudioPlaybackEngine<FakeBackend> {
        AudioPlaybackEngine::new(backend, &ScareConfig::default())
    }

    fn failing_decode() -> FakeBackend {
        let backend = FakeBackend::default();
        *backend.decode_result.borrow_mut() = Err(AudioError::Decode("bad codec".into()));
        backend
    }

    #[test]
    fn test_initialize_loads_buffer_once() {
        let engine = engine(FakeBackend::default());
        assert!(block_on(engine.initialize()));
        assert!(block_on(engine.initialize()));

        let fetches = engine
            .backend()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Fetch(_)))
            .count();
        assert_eq!(fetches, 1);
        assert!(engine.state().buffer_loaded);
        assert!(engine.state().engine_ready);
    }

    #[test]
    fn test_decode_failure_is_permanent() {
        let engine = engine(failing_decode());
        assert!(!block_on(engine.initialize()));
        // even if the codec would work now, no retry happens
        *engine.backend().decode_result.borrow_mut() = Ok("scream");
        assert!(!block_on(engine.initialize()));
        assert_eq!(
            engine
                .backend()
                .calls()
                .iter()
                .filter(|c| **c == Call::Decode)
                .count(),
            1
        );
        assert!(!engine.state().buffer_loaded);
    }

    #[test]
    fn test_fetch_failure_skips_decode() {
        let backend = FakeBackend::default();
        *backend.fetch_result.borrow_mut() = Err(AudioError::Fetch {
            url: "audio/scream.mp3".into(),
            reason: "404".into(),
        });
        let engine = engine(backend);
        assert!(!block_on(engine.initialize()));
        assert!(!engine.backend().calls().contains(&Call::Decode));
    }

    #[test]
    fn test_no_context_means_fallback() {
        let backend = FakeBackend::default();
        backend.context.set(ContextState::Unavailable);
        let engine = engine(backend);
        assert!(!block_on(engine.initialize()));
        assert!(!engine.state().engine_ready);

        assert_eq!(
            block_on(engine.play_scream()),
            PlayOutcome::Played(PlaybackPath::Fallback)
        );
    }

    #[test]
    fn test_muted_play_is_noop() {
        for (enabled, muted) in [(false, false), (true, true), (false, true)] {
            let engine = engine(FakeBackend::default());
            block_on(engine.initialize());
            engine.enabled.set(enabled);
            engine.hard_muted.set(muted);
            engine.backend().clear_calls();
            let before = engine.state();

            assert_eq!(block_on(engine.play_scream()), PlayOutcome::Muted);
            assert!(engine.backend().calls().is_empty());
            assert!(engine.backend().gain.borrow().is_empty());
            assert_eq!(engine.state(), before);
        }
    }

    #[test]
    fn test_primary_path_ramps_gain() {
        let engine = engine(FakeBackend::default());
        block_on(engine.initialize());
        engine.backend().now.set(2.0);

        assert_eq!(
            block_on(engine.play_scream()),
            PlayOutcome::Played(PlaybackPath::Primary)
        );

        let gain = engine.backend().gain.borrow().clone();
        assert_eq!(gain.len(), 2);
        assert_eq!(gain[0], (2.0, GainEvent::Set(GAIN_FLOOR)));
        let (ramp_end, ramp) = gain[1];
        assert!((ramp_end - 2.030).abs() < 1e-9);
        assert_eq!(ramp, GainEvent::Ramp(1.0));
        assert!(engine.backend().calls().contains(&Call::StartBuffer("scream")));
    }

    #[test]
    fn test_new_ramp_cancels_pending_one() {
        let engine = engine(FakeBackend::default());
        block_on(engine.initialize());
        engine.backend().now.set(1.0);
        block_on(engine.play_scream());

        // second scream lands mid-ramp
        engine.backend().now.set(1.01);
        block_on(engine.play_scream());

        let gain = engine.backend().gain.borrow().clone();
        let after_now: Vec<_> = gain.iter().filter(|(t, _)| *t > 1.01).collect();
        assert_eq!(after_now.len(), 1, "only the new ramp may still be scheduled");
        assert!((after_now[0].0 - 1.04).abs() < 1e-9);
    }

    #[test]
    fn test_suspended_context_is_resumed_first() {
        let backend = FakeBackend::default();
        backend.context.set(ContextState::Suspended);
        let engine = engine(backend);
        block_on(engine.initialize());
        engine.backend().clear_calls();

        block_on(engine.play_scream());
        let calls = engine.backend().calls();
        let resume = calls.iter().position(|c| *c == Call::Resume).unwrap();
        let start = calls
            .iter()
            .position(|c| matches!(c, Call::StartBuffer(_)))
            .unwrap();
        assert!(resume < start);
    }

    #[test]
    fn test_prime_only_resumes_suspended() {
        let engine = engine(FakeBackend::default());
        block_on(engine.prime());
        assert!(engine.backend().calls().is_empty());

        engine.backend().context.set(ContextState::Suspended);
        block_on(engine.prime());
        assert_eq!(engine.backend().calls(), vec![Call::Resume]);
        assert_eq!(engine.backend().context_state(), ContextState::Running);
    }

    #[test]
    fn test_resume_failure_is_tolerated() {
        let backend = FakeBackend::default();
        backend.context.set(ContextState::Suspended);
        *backend.resume_result.borrow_mut() = Err(AudioError::Resume("nope".into()));
        let engine = engine(backend);
        block_on(engine.initialize());

        assert_eq!(
            block_on(engine.play_scream()),
            PlayOutcome::Played(PlaybackPath::Primary)
        );
    }

    #[test]
    fn test_primary_failure_falls_back() {
        let backend = FakeBackend::default();
        *backend.start_result.borrow_mut() = Err(AudioError::Playback("source".into()));
        let engine = engine(backend);
        block_on(engine.initialize());

        assert_eq!(
            block_on(engine.play_scream()),
            PlayOutcome::Played(PlaybackPath::Fallback)
        );
        assert!(
            engine
                .backend()
                .calls()
                .contains(&Call::PlayMedia(MediaTrack::Scream, 1.0))
        );
    }

    #[test]
    fn test_scream_stops_suspense() {
        let engine = engine(FakeBackend::default());
        block_on(engine.play_scream());
        assert_eq!(
            engine.backend().calls()[0],
            Call::StopMedia(MediaTrack::Suspense)
        );
    }

    #[test]
    fn test_blocked_fallback_waits_for_one_tap() {
        let engine = engine(failing_decode());
        block_on(engine.initialize());
        engine.backend().queue_media(Err(AudioError::PlaybackBlocked));

        assert_eq!(
            block_on(engine.play_scream()),
            PlayOutcome::BlockedNeedsGesture
        );
        assert!(engine.needs_second_gesture());
        assert!(engine.backend().calls().contains(&Call::Hint(true)));

        // the retry itself is also rejected - still only one attempt
        engine.backend().queue_media(Err(AudioError::PlaybackBlocked));
        assert_eq!(
            block_on(engine.retry_after_gesture()),
            Some(PlayOutcome::BlockedNeedsGesture)
        );
        assert!(!engine.needs_second_gesture());
        assert_eq!(
            engine.backend().calls().last(),
            Some(&Call::PlayMedia(MediaTrack::Scream, 1.0))
        );
        assert!(engine.backend().calls().contains(&Call::Hint(false)));

        assert_eq!(block_on(engine.retry_after_gesture()), None);
    }

    #[test]
    fn test_retry_success_clears_flag() {
        let engine = engine(failing_decode());
        block_on(engine.initialize());
        engine.backend().queue_media(Err(AudioError::PlaybackBlocked));
        block_on(engine.play_scream());

        assert_eq!(
            block_on(engine.retry_after_gesture()),
            Some(PlayOutcome::Played(PlaybackPath::Fallback))
        );
        assert!(!engine.needs_second_gesture());
    }

    #[test]
    fn test_successful_scream_clears_pending_gesture() {
        let engine = engine(failing_decode());
        block_on(engine.initialize());
        engine.backend().queue_media(Err(AudioError::PlaybackBlocked));
        block_on(engine.play_scream());
        assert!(engine.needs_second_gesture());

        assert_eq!(
            block_on(engine.play_scream()),
            PlayOutcome::Played(PlaybackPath::Fallback)
        );
        assert!(!engine.needs_second_gesture());
    }

    #[test]
    fn test_other_media_errors_do_not_ask_for_tap() {
        let engine = engine(failing_decode());
        block_on(engine.initialize());
        engine
            .backend()
            .queue_media(Err(AudioError::Playback("no source".into())));

        assert_eq!(block_on(engine.play_scream()), PlayOutcome::AssetUnavailable);
        assert!(!engine.needs_second_gesture());
    }

    #[test]
    fn test_dismiss_clears_flag_with_hint() {
        let engine = engine(failing_decode());
        block_on(engine.initialize());
        engine.backend().queue_media(Err(AudioError::PlaybackBlocked));
        block_on(engine.play_scream());
        engine.backend().clear_calls();

        engine.dismiss_unlock_hint();
        assert!(!engine.needs_second_gesture());
        assert_eq!(engine.backend().calls(), vec![Call::Hint(false)]);
        // nothing left for a later tap to spend
        assert_eq!(block_on(engine.retry_after_gesture()), None);
    }

    #[test]
    fn test_suspense_volume_and_gate() {
        let engine = engine(FakeBackend::default());
        assert_eq!(
            block_on(engine.play_suspense()),
            PlayOutcome::Played(PlaybackPath::Fallback)
        );
        assert!(
            engine
                .backend()
                .calls()
                .contains(&Call::PlayMedia(MediaTrack::Suspense, 0.6))
        );

        engine.set_hard_muted(true);
        engine.backend().clear_calls();
        assert_eq!(block_on(engine.play_suspense()), PlayOutcome::Muted);
        assert!(engine.backend().calls().is_empty());
    }

    #[test]
    fn test_muting_stops_suspense() {
        let engine = engine(FakeBackend::default());
        engine.set_enabled(false);
        assert_eq!(
            engine.backend().calls(),
            vec![Call::StopMedia(MediaTrack::Suspense)]
        );
    }
}
