//! One-shot task scheduling over virtual time.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::time::Duration;

use tracing::trace;

use super::VirtualClock;
use crate::SimulationError;

/// A task runs once, with access to the scheduler so it can register follow-ups.
pub type Task = Box<dyn FnOnce(&mut dyn Scheduler) -> Result<(), SimulationError> + Send>;

/// The scheduling primitive the churn subsystem consumes from its host.
pub trait Scheduler {
    /// Current virtual time.
    fn now(&self) -> Duration;

    /// Registers `task` to run once virtual time has advanced by `delay`,
    /// unless the host halts first.
    fn schedule_after(&mut self, delay: Duration, task: Task);

    fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }
}

struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Outcome of [`EventQueue::run_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Tasks executed during this run.
    pub delivered: u64,
    /// Tasks still registered but due at or after the stop time.
    pub pending: usize,
    pub stopped_at: Duration,
}

/// Deterministic discrete-event queue. Tasks due at the same instant run in
/// registration order.
#[derive(Default)]
pub struct EventQueue {
    clock: VirtualClock,
    queue: BinaryHeap<Reverse<Pending>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Delivers every task due strictly before `stop_at`, then parks the clock
    /// at `stop_at`. The first task error ends the run and is returned as is.
    pub fn run_until(&mut self, stop_at: Duration) -> Result<RunStats, SimulationError> {
        let mut delivered = 0;
        loop {
            match self.queue.peek() {
                Some(Reverse(next)) if next.due < stop_at => {}
                _ => break,
            }
            let Some(Reverse(event)) = self.queue.pop() else {
                break;
            };
            self.clock.advance_to(event.due);
            trace!(due = ?event.due, seq = event.seq, "Delivering scheduled task");
            (event.task)(self)?;
            delivered += 1;
        }
        self.clock.advance_to(stop_at);

        Ok(RunStats {
            delivered,
            pending: self.queue.len(),
            stopped_at: stop_at,
        })
    }
}

impl Scheduler for EventQueue {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn schedule_after(&mut self, delay: Duration, task: Task) {
        let due = self.clock.now() + delay;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Pending { due, seq, task }));
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("now", &self.clock.now())
            .field("pending", &self.queue.len())
            .finish()
    }
}
