//! Bounded FIFO queue with a gated dequeue.

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::warn;

use crate::context::RunContext;
use crate::error::{Result, SimError};
use crate::event::Event;
use crate::process::{Capacity, StateChanged};
use crate::signal::Signal;
use crate::stats::TimeWeightedCounter;
use crate::time::SimTime;

/// A load joined the queue.
#[derive(Debug, Clone)]
pub struct LoadEnqueued<L> {
    /// The enqueued load.
    pub load: L,
    /// Clock time of the append.
    pub at: SimTime,
}

/// The queue head left the queue.
#[derive(Debug, Clone)]
pub struct LoadDequeued<L> {
    /// The removed load.
    pub load: L,
    /// Clock time of the removal.
    pub at: SimTime,
}

/// An arriving load was rejected because the queue was full.
#[derive(Debug, Clone)]
pub struct LoadBalked<L> {
    /// The rejected load.
    pub load: L,
    /// Clock time of the rejection.
    pub at: SimTime,
}

struct QueueCore<L> {
    capacity: Capacity,
    items: RefCell<VecDeque<L>>,
    // Accepted enqueues whose events have not dispatched yet. The accept
    // fast-path counts these as occupants so that back-to-back accepts at
    // one instant cannot oversubscribe a finite queue.
    pending_enqueues: Cell<usize>,
    to_dequeue: Cell<bool>,
    counter: RefCell<TimeWeightedCounter>,
    load_enqueued: Signal<LoadEnqueued<L>>,
    load_dequeued: Signal<LoadDequeued<L>>,
    load_balked: Signal<LoadBalked<L>>,
    state_changed: Signal<StateChanged>,
}

impl<L: Clone + 'static> QueueCore<L> {
    fn occupancy(&self) -> usize {
        self.items.borrow().len()
    }

    fn committed_occupancy(&self) -> usize {
        self.occupancy() + self.pending_enqueues.get()
    }

    fn observe_occupancy(&self, now: SimTime) -> Result<()> {
        let occupancy = self.occupancy() as f64;
        self.counter.borrow_mut().observe_count(occupancy, now)
    }

    fn handle_enqueue(&self, load: L, ctx: &RunContext) -> Result<()> {
        let now = ctx.clock();
        self.pending_enqueues
            .set(self.pending_enqueues.get().saturating_sub(1));
        if self.capacity.is_full(self.occupancy()) {
            // The queue filled between the synchronous accept and this
            // dispatch.
            warn!(at = now, "enqueue dropped: queue full at dispatch");
            return Ok(());
        }
        self.items.borrow_mut().push_back(load.clone());
        self.observe_occupancy(now)?;
        self.load_enqueued.emit(&LoadEnqueued { load, at: now }, ctx);
        self.state_changed.emit(&StateChanged { at: now }, ctx);
        Ok(())
    }

    fn handle_dequeue(&self, ctx: &RunContext) -> Result<()> {
        if !self.to_dequeue.get() {
            return Ok(());
        }
        let Some(load) = self.items.borrow_mut().pop_front() else {
            return Ok(());
        };
        let now = ctx.clock();
        self.observe_occupancy(now)?;
        self.load_dequeued.emit(&LoadDequeued { load, at: now }, ctx);
        self.state_changed.emit(&StateChanged { at: now }, ctx);
        Ok(())
    }

    fn handle_update_to_dequeue(&self, new_state: bool, ctx: &RunContext) {
        if self.to_dequeue.get() == new_state {
            return;
        }
        self.to_dequeue.set(new_state);
        self.state_changed
            .emit(&StateChanged { at: ctx.clock() }, ctx);
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let mut map = serde_json::Map::new();
        map.insert("occupancy".to_string(), (self.occupancy() as u64).into());
        map.insert("to_dequeue".to_string(), self.to_dequeue.get().into());
        Some(map)
    }
}

struct EnqueueEvent<L> {
    core: Rc<QueueCore<L>>,
    load: Option<L>,
}

impl<L: Clone + 'static> Event for EnqueueEvent<L> {
    fn kind(&self) -> &'static str {
        "queue.enqueue"
    }

    fn apply(&mut self, ctx: &RunContext) -> Result<()> {
        let load = self.load.take().ok_or_else(|| {
            SimError::InconsistentState("enqueue event applied twice".to_string())
        })?;
        self.core.handle_enqueue(load, ctx)
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.core.trace_details()
    }
}

struct DequeueEvent<L> {
    core: Rc<QueueCore<L>>,
}

impl<L: Clone + 'static> Event for DequeueEvent<L> {
    fn kind(&self) -> &'static str {
        "queue.dequeue"
    }

    fn apply(&mut self, ctx: &RunContext) -> Result<()> {
        self.core.handle_dequeue(ctx)
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.core.trace_details()
    }
}

struct UpdateToDequeueEvent<L> {
    core: Rc<QueueCore<L>>,
    new_state: bool,
}

impl<L: Clone + 'static> Event for UpdateToDequeueEvent<L> {
    fn kind(&self) -> &'static str {
        "queue.update_to_dequeue"
    }

    fn apply(&mut self, ctx: &RunContext) -> Result<()> {
        self.core.handle_update_to_dequeue(self.new_state, ctx);
        Ok(())
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.core.trace_details()
    }
}

/// Capacity-limited FIFO buffer for loads with a gated dequeue.
///
/// Occupancy is tracked in a time-weighted counter observed after every
/// mutation, so utilization statistics are available after a run.
pub struct FifoQueue<L> {
    core: Rc<QueueCore<L>>,
}

impl<L> Clone for FifoQueue<L> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<L: Clone + 'static> FifoQueue<L> {
    /// Creates an empty queue with the given capacity; the dequeue gate
    /// starts open.
    pub fn new(capacity: Capacity) -> Self {
        Self {
            core: Rc::new(QueueCore {
                capacity,
                items: RefCell::new(VecDeque::new()),
                pending_enqueues: Cell::new(0),
                to_dequeue: Cell::new(true),
                counter: RefCell::new(TimeWeightedCounter::new()),
                load_enqueued: Signal::new(),
                load_dequeued: Signal::new(),
                load_balked: Signal::new(),
                state_changed: Signal::new(),
            }),
        }
    }

    /// Creates an unbounded queue.
    pub fn unbounded() -> Self {
        Self::new(Capacity::Unbounded)
    }

    /// Attempts to admit a load.
    ///
    /// Fast-rejects synchronously when the queue is finite and full
    /// (counting already-accepted enqueues still in the FEL): emits
    /// [`LoadBalked`] and returns false. Otherwise enqueues an append
    /// event at the current clock and returns true.
    pub fn try_schedule_enqueue(&self, load: L, ctx: &RunContext) -> bool {
        if self.core.capacity.is_full(self.core.committed_occupancy()) {
            self.core.load_balked.emit(
                &LoadBalked {
                    load,
                    at: ctx.clock(),
                },
                ctx,
            );
            return false;
        }
        self.core
            .pending_enqueues
            .set(self.core.pending_enqueues.get() + 1);
        ctx.schedule_now(Box::new(EnqueueEvent {
            core: Rc::clone(&self.core),
            load: Some(load),
        }));
        true
    }

    /// Pokes the queue: when the gate is open and the queue is nonempty,
    /// enqueues a dequeue event at the current clock; otherwise no-op.
    ///
    /// External consumers (e.g. a server becoming idle) call this.
    pub fn trigger_dequeue_attempt(&self, ctx: &RunContext) {
        if self.core.to_dequeue.get() && self.core.occupancy() > 0 {
            ctx.schedule_now(Box::new(DequeueEvent {
                core: Rc::clone(&self.core),
            }));
        }
    }

    /// Enqueues a gate update carrying the new state.
    pub fn schedule_update_to_dequeue(&self, new_state: bool, ctx: &RunContext) {
        ctx.schedule_now(Box::new(UpdateToDequeueEvent {
            core: Rc::clone(&self.core),
            new_state,
        }));
    }

    /// Current number of waiting loads.
    pub fn occupancy(&self) -> usize {
        self.core.occupancy()
    }

    /// Remaining room; `None` when unbounded.
    pub fn vacancy(&self) -> Option<usize> {
        self.core.capacity.vacancy(self.core.occupancy())
    }

    /// Configured capacity.
    pub fn capacity(&self) -> Capacity {
        self.core.capacity
    }

    /// Current gate state.
    pub fn to_dequeue(&self) -> bool {
        self.core.to_dequeue.get()
    }

    /// Snapshot of the waiting loads, head first.
    pub fn waiting_items(&self) -> Vec<L> {
        self.core.items.borrow().iter().cloned().collect()
    }

    /// Time-weighted occupancy statistics.
    pub fn counter(&self) -> Ref<'_, TimeWeightedCounter> {
        self.core.counter.borrow()
    }

    /// Signal fired after each successful append.
    pub fn load_enqueued(&self) -> &Signal<LoadEnqueued<L>> {
        &self.core.load_enqueued
    }

    /// Signal fired after each successful removal.
    pub fn load_dequeued(&self) -> &Signal<LoadDequeued<L>> {
        &self.core.load_dequeued
    }

    /// Signal fired when a load balks at a full queue.
    pub fn load_balked(&self) -> &Signal<LoadBalked<L>> {
        &self.core.load_balked
    }

    /// Signal fired after any observable state change.
    pub fn state_changed(&self) -> &Signal<StateChanged> {
        &self.core.state_changed
    }

    /// Warm-up: restart the occupancy statistics at the current occupancy.
    pub fn warmed_up(&self, at: SimTime) {
        let occupancy = self.core.occupancy() as f64;
        self.core.counter.borrow_mut().warmed_up(at, occupancy);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::context::testing::{drain_events, test_context};

    #[test]
    fn finite_queue_balks_when_full() {
        let ctx = test_context();
        let queue = FifoQueue::new(Capacity::finite(2).expect("valid"));
        let balked = Rc::new(RefCell::new(Vec::new()));
        {
            let balked = Rc::clone(&balked);
            queue
                .load_balked()
                .connect(move |signal, _ctx| balked.borrow_mut().push((signal.load, signal.at)));
        }

        assert!(queue.try_schedule_enqueue("L1", &ctx));
        assert!(queue.try_schedule_enqueue("L2", &ctx));
        drain_events(&ctx);

        assert!(!queue.try_schedule_enqueue("L3", &ctx));
        assert_eq!(*balked.borrow(), vec![("L3", 0.0)]);
        assert_eq!(queue.occupancy(), 2);
        assert_eq!(queue.waiting_items(), vec!["L1", "L2"]);
    }

    #[test]
    fn back_to_back_accepts_cannot_oversubscribe() {
        let ctx = test_context();
        let queue = FifoQueue::new(Capacity::finite(1).expect("valid"));

        // The second accept sees the first one still pending in the FEL.
        assert!(queue.try_schedule_enqueue("L1", &ctx));
        assert!(!queue.try_schedule_enqueue("L2", &ctx));
        drain_events(&ctx);

        assert_eq!(queue.occupancy(), 1);
        assert_eq!(queue.waiting_items(), vec!["L1"]);
    }

    #[test]
    fn enqueue_finding_a_full_queue_at_dispatch_drops() {
        let ctx = test_context();
        let queue = FifoQueue::new(Capacity::finite(1).expect("valid"));

        assert!(queue.try_schedule_enqueue("late", &ctx));
        // Fill the queue behind the pending event's back.
        queue.core.items.borrow_mut().push_back("early");
        drain_events(&ctx);

        assert_eq!(queue.waiting_items(), vec!["early"]);
        assert_eq!(queue.counter().total_increment(), 0.0);
    }

    #[test]
    fn dequeue_removes_the_head_in_fifo_order() {
        let ctx = test_context();
        let queue = FifoQueue::unbounded();
        let removed = Rc::new(RefCell::new(Vec::new()));
        {
            let removed = Rc::clone(&removed);
            queue
                .load_dequeued()
                .connect(move |signal, _ctx| removed.borrow_mut().push(signal.load));
        }

        for load in ["a", "b", "c"] {
            assert!(queue.try_schedule_enqueue(load, &ctx));
        }
        drain_events(&ctx);

        queue.trigger_dequeue_attempt(&ctx);
        drain_events(&ctx);
        queue.trigger_dequeue_attempt(&ctx);
        drain_events(&ctx);

        assert_eq!(*removed.borrow(), vec!["a", "b"]);
        assert_eq!(queue.waiting_items(), vec!["c"]);
    }

    #[test]
    fn dequeue_attempt_on_empty_queue_is_inert() {
        let ctx = test_context();
        let queue: FifoQueue<&str> = FifoQueue::unbounded();
        queue.trigger_dequeue_attempt(&ctx);
        assert_eq!(ctx.scheduler().pending_events(), 0);
    }

    #[test]
    fn closed_gate_blocks_dequeues() {
        let ctx = test_context();
        let queue = FifoQueue::unbounded();
        assert!(queue.try_schedule_enqueue("x", &ctx));
        drain_events(&ctx);

        queue.schedule_update_to_dequeue(false, &ctx);
        drain_events(&ctx);
        assert!(!queue.to_dequeue());

        queue.trigger_dequeue_attempt(&ctx);
        drain_events(&ctx);
        assert_eq!(queue.occupancy(), 1);

        queue.schedule_update_to_dequeue(true, &ctx);
        drain_events(&ctx);
        queue.trigger_dequeue_attempt(&ctx);
        drain_events(&ctx);
        assert_eq!(queue.occupancy(), 0);
    }

    #[test]
    fn unchanged_gate_update_emits_no_state_change() {
        let ctx = test_context();
        let queue: FifoQueue<&str> = FifoQueue::unbounded();
        let changes = Rc::new(RefCell::new(0u32));
        {
            let changes = Rc::clone(&changes);
            queue
                .state_changed()
                .connect(move |_signal, _ctx| *changes.borrow_mut() += 1);
        }

        queue.schedule_update_to_dequeue(true, &ctx); // already true
        drain_events(&ctx);
        assert_eq!(*changes.borrow(), 0);

        queue.schedule_update_to_dequeue(false, &ctx);
        drain_events(&ctx);
        assert_eq!(*changes.borrow(), 1);
    }

    #[test]
    fn counter_tracks_occupancy_over_time() {
        let ctx = test_context();
        let queue = FifoQueue::unbounded();

        assert!(queue.try_schedule_enqueue(1u32, &ctx));
        assert!(queue.try_schedule_enqueue(2u32, &ctx));
        drain_events(&ctx);

        assert_eq!(queue.counter().current_count(), 2.0);
        assert_eq!(queue.counter().total_increment(), 2.0); // 0→1→2
    }

    #[test]
    fn balanced_enqueue_dequeue_leaves_the_queue_empty() {
        let ctx = test_context();
        let queue = FifoQueue::unbounded();
        let n = 5;

        for load in 0..n {
            assert!(queue.try_schedule_enqueue(load, &ctx));
        }
        drain_events(&ctx);
        for _ in 0..n {
            queue.trigger_dequeue_attempt(&ctx);
            drain_events(&ctx);
        }

        assert_eq!(queue.occupancy(), 0);
        assert_eq!(queue.counter().total_increment(), f64::from(n));
        assert_eq!(queue.counter().total_decrement(), f64::from(n));
    }

    #[test]
    fn warmup_rebaselines_at_current_occupancy() {
        let ctx = test_context();
        let queue = FifoQueue::unbounded();
        assert!(queue.try_schedule_enqueue("x", &ctx));
        assert!(queue.try_schedule_enqueue("y", &ctx));
        drain_events(&ctx);

        queue.warmed_up(10.0);
        let counter = queue.counter();
        assert_eq!(counter.initial_time(), 10.0);
        assert_eq!(counter.current_count(), 2.0);
        assert_eq!(counter.total_active_duration(), 0.0);
    }
}
