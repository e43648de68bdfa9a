//! Structured trace records for scheduled and dispatched events.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::event::EventId;
use crate::time::SimTime;

/// Point in an event's lifecycle at which a record is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TracePoint {
    /// The event was enqueued into the FEL.
    EventScheduled,
    /// The event is about to execute (clock already advanced).
    EventExecuting,
    /// The event's `apply` returned successfully.
    EventCompleted,
}

/// One structured trace record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Lifecycle point.
    pub point: TracePoint,
    /// Clock value when the record was emitted.
    pub clock_time: SimTime,
    /// Identifier of the event.
    pub event_id: EventId,
    /// Stable dotted event name.
    pub event_kind: String,
    /// Event-supplied details, computed at emission time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Observer receiving trace records from the kernel.
pub trait Tracer {
    /// Receives one record. Called synchronously from the run loop.
    fn trace(&mut self, record: TraceRecord);
}

/// Tracer that captures records into an in-memory list.
///
/// Cheap to clone; clones share the same buffer, so keep a clone before
/// handing one to the kernel and read the records after the run. For long
/// runs substitute a streaming sink: this buffer is unbounded.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracer {
    records: Rc<RefCell<Vec<TraceRecord>>>,
}

impl InMemoryTracer {
    /// Creates an empty tracer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured records, in emission order.
    pub fn records(&self) -> Ref<'_, Vec<TraceRecord>> {
        self.records.borrow()
    }

    /// Number of captured records.
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// True when nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Serializes all captured records as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&*self.records.borrow())
    }
}

impl Tracer for InMemoryTracer {
    fn trace(&mut self, record: TraceRecord) {
        self.records.borrow_mut().push(record);
    }
}
