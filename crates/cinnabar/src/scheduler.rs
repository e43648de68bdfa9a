//! The scheduling surface over the FEL, clock, and sequence counter.
//!
//! All three live behind one mutex so that scheduling calls stay coherent
//! even if a future harness invokes them from another thread; the dispatch
//! surface itself is single-threaded (one run loop, handlers run to
//! completion).

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::SimClock;
use crate::error::{Result, SimError};
use crate::event::{Event, EventId, FelEntry, FutureEventList};
use crate::time::{SimTime, SimulationTimeUnit};
use crate::trace::{TracePoint, TraceRecord, Tracer};

/// Operation set consumed by events to enqueue further events.
pub trait Scheduler {
    /// Enqueues an event at an absolute simulation time.
    ///
    /// Fails with [`SimError::TimeRegression`] when `time` is behind the
    /// clock. Scheduling at the current clock time is valid; such events
    /// execute strictly after the currently executing one (FIFO via the
    /// sequence number).
    fn schedule_at(&self, event: Box<dyn Event>, time: SimTime) -> Result<EventId>;

    /// Enqueues an event after a delay expressed in clock units.
    ///
    /// Fails with [`SimError::NegativeDelay`] when `delay < 0`.
    fn schedule_in(&self, event: Box<dyn Event>, delay: SimTime) -> Result<EventId>;

    /// Enqueues an event after a wall-style duration, converted into clock
    /// units through the kernel's construction-time unit.
    fn schedule_after(&self, event: Box<dyn Event>, delay: Duration) -> Result<EventId>;
}

struct SchedulerState {
    fel: FutureEventList,
    clock: SimClock,
    executed_events: u64,
    time_unit: SimulationTimeUnit,
    tracer: Option<Box<dyn Tracer>>,
}

/// Clonable handle over the kernel's scheduling state.
#[derive(Clone)]
pub struct SchedulerHandle {
    state: Arc<Mutex<SchedulerState>>,
}

impl SchedulerHandle {
    pub(crate) fn new(time_unit: SimulationTimeUnit) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                fel: FutureEventList::new(),
                clock: SimClock::new(),
                executed_events: 0,
                time_unit,
                tracer: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().expect("scheduler mutex poisoned")
    }

    /// Current simulation time.
    pub fn clock(&self) -> SimTime {
        self.lock().clock.now()
    }

    /// Number of events dispatched so far in this run.
    pub fn executed_events(&self) -> u64 {
        self.lock().executed_events
    }

    /// Number of entries pending in the FEL.
    pub fn pending_events(&self) -> usize {
        self.lock().fel.len()
    }

    /// Clock unit this scheduler converts durations with.
    pub fn time_unit(&self) -> SimulationTimeUnit {
        self.lock().time_unit
    }

    pub(crate) fn set_tracer(&self, tracer: Option<Box<dyn Tracer>>) {
        self.lock().tracer = tracer;
    }

    /// Enqueues at the current clock without a fallible time check.
    pub(crate) fn schedule_now(&self, event: Box<dyn Event>) -> EventId {
        let mut state = self.lock();
        let now = state.clock.now();
        push_traced(&mut state, now, event)
    }

    /// Dequeues the earliest entry, verifying and advancing the clock.
    ///
    /// Returns `Ok(None)` when the FEL is empty.
    pub(crate) fn pop_next(&self) -> Result<Option<FelEntry>> {
        let mut state = self.lock();
        let Some(entry) = state.fel.pop() else {
            return Ok(None);
        };
        let now = state.clock.now();
        if entry.time < now {
            return Err(SimError::ClockRegression {
                event_time: entry.time,
                clock: now,
            });
        }
        state.clock.advance_to(entry.time);
        Ok(Some(entry))
    }

    /// Emits a dispatch-side trace record for the given entry.
    pub(crate) fn trace_dispatch(&self, point: TracePoint, entry: &FelEntry) {
        let mut state = self.lock();
        if state.tracer.is_none() {
            return;
        }
        let record = TraceRecord {
            point,
            clock_time: state.clock.now(),
            event_id: entry.id,
            event_kind: entry.event.kind().to_string(),
            details: entry.event.trace_details(),
        };
        if let Some(tracer) = state.tracer.as_mut() {
            tracer.trace(record);
        }
    }

    pub(crate) fn increment_executed(&self) {
        self.lock().executed_events += 1;
    }
}

impl Scheduler for SchedulerHandle {
    fn schedule_at(&self, event: Box<dyn Event>, time: SimTime) -> Result<EventId> {
        if !time.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "scheduling time must be finite, got {time}"
            )));
        }
        let mut state = self.lock();
        let now = state.clock.now();
        if time < now {
            return Err(SimError::TimeRegression {
                attempted: time,
                clock: now,
            });
        }
        Ok(push_traced(&mut state, time, event))
    }

    fn schedule_in(&self, event: Box<dyn Event>, delay: SimTime) -> Result<EventId> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::NegativeDelay(delay));
        }
        let mut state = self.lock();
        let time = state.clock.now() + delay;
        Ok(push_traced(&mut state, time, event))
    }

    fn schedule_after(&self, event: Box<dyn Event>, delay: Duration) -> Result<EventId> {
        let units = self.time_unit().duration_to_units(delay);
        self.schedule_in(event, units)
    }
}

/// Enqueues the event, assigning identity and sequence, and emits the
/// `EventScheduled` trace.
fn push_traced(state: &mut SchedulerState, time: SimTime, event: Box<dyn Event>) -> EventId {
    let details = event.trace_details();
    let kind = event.kind();
    let id = state.fel.push(time, event);
    let clock_time = state.clock.now();
    if let Some(tracer) = state.tracer.as_mut() {
        tracer.trace(TraceRecord {
            point: TracePoint::EventScheduled,
            clock_time,
            event_id: id,
            event_kind: kind.to_string(),
            details,
        });
    }
    id
}
