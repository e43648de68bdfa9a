//! Simulation time scalar and unit conversions.
//!
//! The clock is a plain `f64` in *simulation-time units*. A kernel is
//! constructed with a [`SimulationTimeUnit`] that fixes how duration-typed
//! delays convert into clock units; sampler-supplied durations are already
//! expressed in clock units and need no conversion.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Simulation timestamp type (continuous time).
pub type SimTime = f64;

// One tick is 100 ns.
const NANOS_PER_TICK: f64 = 100.0;

/// Unit of the simulation clock.
///
/// Conversion goes through ticks (1 tick = 100 ns):
/// `delay_in_units = delay_ticks / ticks_per_unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationTimeUnit {
    /// Raw 100 ns ticks.
    Ticks,
    /// Microseconds.
    Microseconds,
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
}

impl SimulationTimeUnit {
    /// Number of ticks in one unit of this kind.
    pub fn ticks_per_unit(self) -> f64 {
        match self {
            Self::Ticks => 1.0,
            Self::Microseconds => 10.0,
            Self::Milliseconds => 10_000.0,
            Self::Seconds => 10_000_000.0,
            Self::Minutes => 600_000_000.0,
            Self::Hours => 36_000_000_000.0,
            Self::Days => 864_000_000_000.0,
        }
    }

    /// Converts a wall-style duration into clock units.
    pub fn duration_to_units(self, duration: Duration) -> SimTime {
        let ticks = duration.as_nanos() as f64 / NANOS_PER_TICK;
        ticks / self.ticks_per_unit()
    }
}
