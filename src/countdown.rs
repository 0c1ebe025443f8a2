//! Countdown before the scare
//!
//! Four fixed steps, one per second, then the completion callback. There is
//! no way to cancel a countdown once it has started.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::ScareConfig;
use crate::schedule::Scheduler;

/// Where the countdown shows up
pub trait CountdownView {
    /// Show the overlay (if hidden) with this step's text
    fn show_step(&self, text: &str);
    /// Clear and hide the overlay
    fn hide(&self);
    /// Kick off the ambient suspense track. Best-effort, must not block.
    fn start_ambience(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Hidden,
    /// Showing the step at this index
    Showing(usize),
}

pub struct CountdownController {
    steps: Rc<[String]>,
    step_ms: f64,
    state: Rc<Cell<CountdownState>>,
}

/// Everything one run carries from step to step
struct Run {
    steps: Rc<[String]>,
    step_ms: f64,
    state: Rc<Cell<CountdownState>>,
    scheduler: Rc<dyn Scheduler>,
    view: Rc<dyn CountdownView>,
    on_finish: Box<dyn FnOnce()>,
}

impl CountdownController {
    pub fn new(steps: Vec<String>, step_ms: f64) -> Self {
        Self {
            steps: steps.into(),
            step_ms,
            state: Rc::new(Cell::new(CountdownState::Hidden)),
        }
    }

    pub fn from_config(config: &ScareConfig) -> Self {
        Self::new(config.countdown_steps.clone(), config.countdown_step_ms)
    }

    pub fn state(&self) -> CountdownState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state.get() != CountdownState::Hidden
    }

    /// Total time from `start` to `on_finish` (ms)
    pub fn total_ms(&self) -> f64 {
        self.steps.len() as f64 * self.step_ms
    }

    /// Start the countdown. `on_finish` runs exactly once, after the last step.
    ///
    /// Returns false (and does nothing) if a countdown is already running.
    pub fn start(
        &self,
        scheduler: Rc<dyn Scheduler>,
        view: Rc<dyn CountdownView>,
        on_finish: impl FnOnce() + 'static,
    ) -> bool {
        if self.is_running() {
            log::warn!("Countdown already running, ignoring start");
            return false;
        }

        log::info!("Countdown started ({} steps)", self.steps.len());
        self.state.set(CountdownState::Showing(0));
        view.start_ambience();

        show_step(
            Run {
                steps: self.steps.clone(),
                step_ms: self.step_ms,
                state: self.state.clone(),
                scheduler,
                view,
                on_finish: Box::new(on_finish),
            },
            0,
        );
        true
    }
}

fn show_step(run: Run, index: usize) {
    if let Some(text) = run.steps.get(index) {
        run.state.set(CountdownState::Showing(index));
        run.view.show_step(text);
        log::debug!("Countdown step {}: {}", index, text);

        let scheduler = run.scheduler.clone();
        let delay = run.step_ms;
        scheduler.defer(delay, Box::new(move || show_step(run, index + 1)));
    } else {
        run.state.set(CountdownState::Hidden);
        run.view.hide();
        log::info!("Countdown finished");
        (run.on_finish)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ManualScheduler;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingView {
        shown: RefCell<Vec<(f64, String)>>,
        hidden: Cell<u32>,
        ambience: Cell<u32>,
        clock: RefCell<Option<Rc<ManualScheduler>>>,
    }

    impl RecordingView {
        fn now(&self) -> f64 {
            self.clock.borrow().as_ref().map_or(0.0, |c| c.now_ms())
        }
    }

    impl CountdownView for RecordingView {
        fn show_step(&self, text: &str) {
            let now = self.now();
            self.shown.borrow_mut().push((now, text.to_string()));
        }
        fn hide(&self) {
            self.hidden.set(self.hidden.get() + 1);
        }
        fn start_ambience(&self) {
            self.ambience.set(self.ambience.get() + 1);
        }
    }

    fn setup() -> (Rc<ManualScheduler>, Rc<RecordingView>, CountdownController) {
        let sched = Rc::new(ManualScheduler::new());
        let view = Rc::new(RecordingView::default());
        *view.clock.borrow_mut() = Some(sched.clone());
        let countdown = CountdownController::from_config(&ScareConfig::default());
        (sched, view, countdown)
    }

    #[test]
    fn test_finishes_once_after_four_seconds() {
        let (sched, view, countdown) = setup();
        let finished_at = Rc::new(RefCell::new(Vec::new()));
        {
            let finished_at = finished_at.clone();
            let clock = sched.clone();
            assert!(countdown.start(sched.clone(), view.clone(), move || {
                finished_at.borrow_mut().push(clock.now_ms());
            }));
        }

        sched.advance(3999.0);
        assert!(finished_at.borrow().is_empty());
        assert_eq!(countdown.state(), CountdownState::Showing(3));

        sched.run_until_idle();
        assert_eq!(*finished_at.borrow(), vec![4000.0]);
        assert_eq!(countdown.state(), CountdownState::Hidden);
        assert_eq!(view.hidden.get(), 1);
    }

    #[test]
    fn test_steps_shown_one_per_second() {
        let (sched, view, countdown) = setup();
        countdown.start(sched.clone(), view.clone(), || {});
        sched.run_until_idle();

        let shown = view.shown.borrow();
        let expected = [
            (0.0, "are you ready?"),
            (1000.0, "3"),
            (2000.0, "2"),
            (3000.0, "1"),
        ];
        assert_eq!(shown.len(), expected.len());
        for ((t, text), (et, etext)) in shown.iter().zip(expected) {
            assert_eq!(*t, et);
            assert_eq!(text, etext);
        }
    }

    #[test]
    fn test_ambience_starts_with_first_step() {
        let (sched, view, countdown) = setup();
        countdown.start(sched.clone(), view.clone(), || {});
        assert_eq!(view.ambience.get(), 1);
        assert_eq!(countdown.state(), CountdownState::Showing(0));
        sched.run_until_idle();
        assert_eq!(view.ambience.get(), 1);
    }

    #[test]
    fn test_reentrant_start_is_ignored() {
        let (sched, view, countdown) = setup();
        let calls = Rc::new(Cell::new(0));
        for _ in 0..2 {
            let calls = calls.clone();
            countdown.start(sched.clone(), view.clone(), move || calls.set(calls.get() + 1));
        }
        sched.run_until_idle();
        assert_eq!(calls.get(), 1);
        assert_eq!(view.ambience.get(), 1);
    }

    #[test]
    fn test_total_ms() {
        let countdown = CountdownController::new(vec!["go".into()], 250.0);
        assert_eq!(countdown.total_ms(), 250.0);
    }
}
