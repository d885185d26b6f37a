//! ## churnsim-core::time
//! **Virtual clock & scheduler**
//!
//! The churn subsystem never advances time itself. It reads the clock for
//! diagnostics and registers one-shot tasks through [`Scheduler`]; the
//! [`EventQueue`] is the in-tree host that delivers them.

mod scheduler;

pub use scheduler::{EventQueue, RunStats, Scheduler, Task};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Simulation time in nanoseconds, shared between clones.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    #[inline]
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns())
    }

    /// Current virtual time in seconds, as printed in diagnostics.
    #[inline]
    pub fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }

    /// Moves the clock forward to `at`. Virtual time never runs backwards, so
    /// an earlier `at` leaves the clock untouched.
    pub fn advance_to(&self, at: Duration) {
        self.offset
            .fetch_max(at.as_nanos() as u64, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_initial_value() {
        let clock = VirtualClock::new();
        assert_eq!(clock.now_ns(), 0);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_clock_advance_to() {
        let clock = VirtualClock::new();
        clock.advance_to(Duration::from_nanos(500));
        assert_eq!(clock.now_ns(), 500);
        clock.advance_to(Duration::from_nanos(750));
        assert_eq!(clock.now_ns(), 750);
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let clock = VirtualClock::new();
        clock.advance_to(Duration::from_secs(20));
        clock.advance_to(Duration::from_secs(5));
        assert_eq!(clock.now(), Duration::from_secs(20));
        assert_eq!(clock.now_secs(), 20.0);
    }

    #[test]
    fn test_clones_share_time() {
        let clock = VirtualClock::new();
        let observer = clock.clone();
        clock.advance_to(Duration::from_secs(1));
        assert_eq!(observer.now(), Duration::from_secs(1));
    }
}
