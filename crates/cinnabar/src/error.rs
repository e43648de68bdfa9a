//! Error types for simulation runs.

use thiserror::Error;

use crate::event::EventId;
use crate::time::SimTime;

/// Simulation errors.
///
/// Expected outcomes (a full queue balking a load, a depleted pool refusing
/// an acquire) are *signals*, not errors; this enum covers contract
/// violations and faults that terminate a run.
#[derive(Error, Debug)]
pub enum SimError {
    /// Out-of-range argument: capacities, rates, percentiles, bin widths.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted in the wrong lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Attempt to schedule or observe at a time earlier than the clock.
    #[error("time regression: attempted time {attempted} is behind {clock}")]
    TimeRegression {
        /// Time the caller asked for.
        attempted: SimTime,
        /// Current clock (or counter time) the attempt fell behind.
        clock: SimTime,
    },

    /// Negative delay passed to a relative scheduling call.
    #[error("negative delay: {0}")]
    NegativeDelay(SimTime),

    /// The run loop dequeued an event scheduled before the current clock.
    #[error("clock regression: dequeued event at {event_time} behind clock {clock}")]
    ClockRegression {
        /// Execution time carried by the dequeued event.
        event_time: SimTime,
        /// Clock value at the moment of the dequeue.
        clock: SimTime,
    },

    /// Fatal primitive-state corruption (e.g. completion for an unknown load).
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// A fault escaped `SimulationModel::initialize`.
    #[error("model initialization failed: {source}")]
    InitFailed {
        /// Underlying fault.
        #[source]
        source: Box<SimError>,
    },

    /// A fault escaped an event's `apply` during dispatch.
    #[error("event {event_id} failed at t={at}: {source}")]
    EventFailed {
        /// Identifier of the failing event.
        event_id: EventId,
        /// Clock time at which the event was executing.
        at: SimTime,
        /// Underlying fault.
        #[source]
        source: Box<SimError>,
    },
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
