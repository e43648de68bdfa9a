//! The nondecreasing simulation clock.

use crate::time::SimTime;

/// Virtual clock owned by the kernel.
///
/// Advances only when the run loop dequeues an event; never moves backward
/// during a run. The kernel checks for regressions before advancing and
/// surfaces them as errors; the `debug_assert` here is a second line of
/// defense for internal callers.
#[derive(Debug, Clone)]
pub struct SimClock {
    now: SimTime,
}

impl SimClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    /// Current simulation time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Advances the clock to the given time.
    pub fn advance_to(&mut self, time: SimTime) {
        debug_assert!(
            time >= self.now,
            "time cannot go backwards: current={}, target={}",
            self.now,
            time
        );
        self.now = time;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}
