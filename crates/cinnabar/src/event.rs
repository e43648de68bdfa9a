//! Events and the future-event list (FEL).
//!
//! An event is the unit of state change: it carries *when* (assigned at
//! enqueue time) and *what-to-do-on* (a back-reference into its owning
//! primitive); the primitive is the authoritative site of the state
//! transition. Once dispatched and applied, the event is discarded.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::Result;
use crate::time::SimTime;

/// Monotonic, process-unique event identifier assigned at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    /// Creates an identifier from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A schedulable unit of state change.
///
/// Implementors are plain data types carrying a back-reference to their
/// owning primitive plus any payload. `apply` runs to completion on the
/// kernel's single thread of control; the only way to "wait" is to
/// schedule a follow-on event at a later time.
pub trait Event {
    /// Stable dotted name for trace records, e.g. `"queue.enqueue"`.
    fn kind(&self) -> &'static str;

    /// Executes the event's effect against the model.
    ///
    /// Handlers may freely schedule further events through the context;
    /// this enqueues into the FEL without suspending the current handler.
    fn apply(&mut self, ctx: &RunContext) -> Result<()>;

    /// Structured details for trace records.
    ///
    /// Called at trace-emission time, so implementations that read their
    /// owning primitive's state report the state *at dispatch*, not a
    /// snapshot captured when the event was scheduled.
    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        None
    }
}

/// FEL entry: an event plus its `(time, sequence)` priority.
pub(crate) struct FelEntry {
    pub(crate) id: EventId,
    pub(crate) time: SimTime,
    pub(crate) seq: u64,
    pub(crate) event: Box<dyn Event>,
}

impl PartialEq for FelEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time.total_cmp(&other.time) == Ordering::Equal && self.seq == other.seq
    }
}

impl Eq for FelEntry {}

impl PartialOrd for FelEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FelEntry {
    // Reversed so the std max-heap pops the earliest (time, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

/// Min-ordered collection of pending events.
///
/// Priority is `(execution_time, scheduling_sequence)`; the sequence is a
/// monotonically increasing integer assigned at enqueue, guaranteeing FIFO
/// tie-break for events scheduled at the same simulation time.
pub(crate) struct FutureEventList {
    heap: BinaryHeap<FelEntry>,
    next_seq: u64,
    next_id: u64,
}

impl FutureEventList {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            next_id: 0,
        }
    }

    /// Enqueues an event at the given time, assigning its identity and
    /// sequence number.
    pub(crate) fn push(&mut self, time: SimTime, event: Box<dyn Event>) -> EventId {
        let id = EventId::new(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(FelEntry {
            id,
            time,
            seq,
            event,
        });
        id
    }

    /// Removes and returns the earliest entry.
    pub(crate) fn pop(&mut self) -> Option<FelEntry> {
        self.heap.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
