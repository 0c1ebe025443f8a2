//! Deferred job facility
//!
//! Every timed thing in a run (countdown steps, effect stages, feedback
//! timeouts) is a fire-and-forget job submitted here with a delay. Jobs
//! never wait on each other, only on elapsed time, and nothing can be
//! cancelled once submitted.

use std::cell::RefCell;

/// A one-shot deferred callback
pub type Job = Box<dyn FnOnce() + 'static>;

pub trait Scheduler {
    /// Run `job` once, `delay_ms` from now. Negative delays run as soon as possible.
    fn defer(&self, delay_ms: f64, job: Job);
}

struct Pending {
    due: f64,
    seq: u64,
    job: Job,
}

#[derive(Default)]
struct ManualState {
    now: f64,
    next_seq: u64,
    queue: Vec<Pending>,
}

/// Virtual clock for native previews and tests.
///
/// Time only moves when told to. Jobs due at the same instant run in
/// submission order, and jobs may submit further jobs while running.
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time (ms since creation)
    pub fn now_ms(&self) -> f64 {
        self.state.borrow().now
    }

    /// Number of jobs still waiting
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Move the clock forward, running every job that falls due on the way
    pub fn advance(&self, ms: f64) {
        let target = self.now_ms() + ms.max(0.0);
        while let Some(job) = self.pop_due(target) {
            job();
        }
        self.state.borrow_mut().now = target;
    }

    /// Run until no jobs remain
    pub fn run_until_idle(&self) {
        loop {
            let next_due = self
                .state
                .borrow()
                .queue
                .iter()
                .map(|p| p.due)
                .fold(None, |acc: Option<f64>, due| {
                    Some(acc.map_or(due, |a| a.min(due)))
                });
            match next_due {
                Some(due) => self.advance(due - self.now_ms()),
                None => break,
            }
        }
    }

    /// Take the earliest job due at or before `target`, moving the clock to it.
    /// The borrow is released before the caller runs the job.
    fn pop_due(&self, target: f64) -> Option<Job> {
        let mut state = self.state.borrow_mut();
        let idx = state
            .queue
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        let pending = state.queue.swap_remove(idx);
        state.now = state.now.max(pending.due);
        Some(pending.job)
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, delay_ms: f64, job: Job) {
        let mut state = self.state.borrow_mut();
        let due = state.now + delay_ms.max(0.0);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(Pending { due, seq, job });
    }
}
