//! Read-only view over the kernel handed to events and models.

use std::time::Duration;

use crate::error::Result;
use crate::event::{Event, EventId};
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::time::SimTime;

/// Run context: current clock, executed-event count, and the scheduler.
///
/// Cheap to clone; all clones view the same kernel. Mutated only by the
/// kernel: events and primitives read the clock and enqueue follow-on
/// events, nothing else.
#[derive(Clone)]
pub struct RunContext {
    scheduler: SchedulerHandle,
}

impl RunContext {
    pub(crate) fn new(scheduler: SchedulerHandle) -> Self {
        Self { scheduler }
    }

    /// Current simulation time.
    pub fn clock(&self) -> SimTime {
        self.scheduler.clock()
    }

    /// Number of events dispatched so far in this run.
    pub fn executed_events(&self) -> u64 {
        self.scheduler.executed_events()
    }

    /// The scheduler handle.
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Enqueues an event at an absolute simulation time.
    pub fn schedule_at(&self, event: Box<dyn Event>, time: SimTime) -> Result<EventId> {
        self.scheduler.schedule_at(event, time)
    }

    /// Enqueues an event after a delay in clock units.
    pub fn schedule_in(&self, event: Box<dyn Event>, delay: SimTime) -> Result<EventId> {
        self.scheduler.schedule_in(event, delay)
    }

    /// Enqueues an event after a wall-style duration.
    pub fn schedule_after(&self, event: Box<dyn Event>, delay: Duration) -> Result<EventId> {
        self.scheduler.schedule_after(event, delay)
    }

    /// Enqueues an event at the current clock (cannot regress).
    pub(crate) fn schedule_now(&self, event: Box<dyn Event>) -> EventId {
        self.scheduler.schedule_now(event)
    }
}
