//! Run strategies: the predicate deciding whether the loop continues.
//!
//! The strategy is evaluated at the head of every loop iteration, before
//! the next dispatch. A timeout is a strategy that returns false once the
//! clock reaches a configured stop time; there is no generic
//! event-cancellation facility.

use crate::context::RunContext;
use crate::error::{Result, SimError};
use crate::time::SimTime;

/// Predicate evaluated each loop iteration; optionally exposes a warm-up
/// end time at which warm-up-aware models are notified once.
pub trait RunStrategy {
    /// True to dispatch the next event, false to stop the run.
    fn should_continue(&self, ctx: &RunContext) -> bool;

    /// Simulation time at which warm-up ends, if any.
    fn warmup_end_time(&self) -> Option<SimTime> {
        None
    }
}

/// Runs while `clock < run_duration`.
#[derive(Debug, Clone)]
pub struct DurationStrategy {
    run_duration: SimTime,
    warmup: Option<SimTime>,
}

impl DurationStrategy {
    /// Creates a strategy stopping once the clock reaches `run_duration`.
    pub fn new(run_duration: SimTime) -> Result<Self> {
        if !run_duration.is_finite() || run_duration <= 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "run duration must be positive, got {run_duration}"
            )));
        }
        Ok(Self {
            run_duration,
            warmup: None,
        })
    }

    /// Adds a warm-up end time; must satisfy `0 <= warmup < run_duration`.
    pub fn with_warmup(mut self, warmup: SimTime) -> Result<Self> {
        if !warmup.is_finite() || warmup < 0.0 || warmup >= self.run_duration {
            return Err(SimError::InvalidArgument(format!(
                "warmup must be in [0, {}), got {warmup}",
                self.run_duration
            )));
        }
        self.warmup = Some(warmup);
        Ok(self)
    }

    /// Configured run duration.
    pub fn run_duration(&self) -> SimTime {
        self.run_duration
    }
}

impl RunStrategy for DurationStrategy {
    fn should_continue(&self, ctx: &RunContext) -> bool {
        ctx.clock() < self.run_duration
    }

    fn warmup_end_time(&self) -> Option<SimTime> {
        self.warmup
    }
}

/// Runs while `clock < stop_time`.
#[derive(Debug, Clone)]
pub struct AbsoluteTimeStrategy {
    stop_time: SimTime,
    warmup: Option<SimTime>,
}

impl AbsoluteTimeStrategy {
    /// Creates a strategy stopping once the clock reaches `stop_time`.
    pub fn new(stop_time: SimTime) -> Result<Self> {
        if !stop_time.is_finite() || stop_time <= 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "stop time must be positive, got {stop_time}"
            )));
        }
        Ok(Self {
            stop_time,
            warmup: None,
        })
    }

    /// Adds a warm-up end time; must satisfy `0 <= warmup < stop_time`.
    pub fn with_warmup(mut self, warmup: SimTime) -> Result<Self> {
        if !warmup.is_finite() || warmup < 0.0 || warmup >= self.stop_time {
            return Err(SimError::InvalidArgument(format!(
                "warmup must be in [0, {}), got {warmup}",
                self.stop_time
            )));
        }
        self.warmup = Some(warmup);
        Ok(self)
    }

    /// Configured stop time.
    pub fn stop_time(&self) -> SimTime {
        self.stop_time
    }
}

impl RunStrategy for AbsoluteTimeStrategy {
    fn should_continue(&self, ctx: &RunContext) -> bool {
        ctx.clock() < self.stop_time
    }

    fn warmup_end_time(&self) -> Option<SimTime> {
        self.warmup
    }
}

/// Runs while a user predicate over the context holds.
pub struct ConditionalStrategy {
    predicate: Box<dyn Fn(&RunContext) -> bool>,
    warmup: Option<SimTime>,
}

impl ConditionalStrategy {
    /// Creates a strategy from a predicate.
    pub fn new(predicate: impl Fn(&RunContext) -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            warmup: None,
        }
    }

    /// Adds a warm-up end time; must satisfy `warmup >= 0`.
    pub fn with_warmup(mut self, warmup: SimTime) -> Result<Self> {
        if !warmup.is_finite() || warmup < 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "warmup must be nonnegative, got {warmup}"
            )));
        }
        self.warmup = Some(warmup);
        Ok(self)
    }
}

impl RunStrategy for ConditionalStrategy {
    fn should_continue(&self, ctx: &RunContext) -> bool {
        (self.predicate)(ctx)
    }

    fn warmup_end_time(&self) -> Option<SimTime> {
        self.warmup
    }
}
