//! Pool of interchangeable, reusable resource tokens.

use std::cell::{Ref, RefCell};
use std::fmt::Debug;
use std::rc::Rc;

use tracing::warn;

use crate::context::RunContext;
use crate::signal::Signal;
use crate::stats::TimeWeightedCounter;
use crate::time::SimTime;

/// A token was handed out.
#[derive(Debug, Clone)]
pub struct ResourceAcquired<R> {
    /// The acquired token.
    pub token: R,
    /// Clock time of the acquisition.
    pub at: SimTime,
}

/// A token returned to the idle list.
#[derive(Debug, Clone)]
pub struct ResourceReleased<R> {
    /// The released token.
    pub token: R,
    /// Clock time of the release.
    pub at: SimTime,
}

/// An acquisition attempt found the pool depleted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestFailed {
    /// Clock time of the failed attempt.
    pub at: SimTime,
}

struct PoolCore<R> {
    total_capacity: usize,
    // Idle tokens; the back is the most recently released (LIFO reuse).
    idle: RefCell<Vec<R>>,
    counter: RefCell<TimeWeightedCounter>,
    resource_acquired: Signal<ResourceAcquired<R>>,
    resource_released: Signal<ResourceReleased<R>>,
    request_failed: Signal<RequestFailed>,
}

/// Pool of reusable tokens with synchronous acquisition.
///
/// There is no built-in wait queue; callers that need queued acquisition
/// compose one from a [`crate::FifoQueue`]. Busy-token counts feed a
/// time-weighted counter observed on every acquire and release.
pub struct ResourcePool<R> {
    core: Rc<PoolCore<R>>,
}

impl<R> Clone for ResourcePool<R> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<R: Clone + PartialEq + Debug + 'static> ResourcePool<R> {
    /// Creates a pool whose capacity is the number of supplied tokens.
    ///
    /// The last supplied token is the first acquired.
    pub fn new(tokens: Vec<R>) -> Self {
        Self {
            core: Rc::new(PoolCore {
                total_capacity: tokens.len(),
                idle: RefCell::new(tokens),
                counter: RefCell::new(TimeWeightedCounter::new()),
                resource_acquired: Signal::new(),
                resource_released: Signal::new(),
                request_failed: Signal::new(),
            }),
        }
    }

    /// Attempts to acquire a token.
    ///
    /// Hands out the most recently released token (LIFO reuse). On a
    /// depleted pool, emits [`RequestFailed`] and returns `None`.
    pub fn try_acquire(&self, ctx: &RunContext) -> Option<R> {
        let at = ctx.clock();
        let token = self.core.idle.borrow_mut().pop();
        let Some(token) = token else {
            self.core.request_failed.emit(&RequestFailed { at }, ctx);
            return None;
        };
        self.observe_busy(at);
        self.core.resource_acquired.emit(
            &ResourceAcquired {
                token: token.clone(),
                at,
            },
            ctx,
        );
        Some(token)
    }

    /// Returns a token to the pool.
    ///
    /// Releasing into a full pool, or releasing a token that is already
    /// idle, logs a diagnostic and no-ops (double-release guard).
    pub fn release(&self, token: R, ctx: &RunContext) {
        let at = ctx.clock();
        {
            let idle = self.core.idle.borrow();
            if idle.len() >= self.core.total_capacity {
                warn!(at, "release ignored: pool already full");
                return;
            }
            if idle.contains(&token) {
                warn!(at, "release ignored: token already idle: {token:?}");
                return;
            }
        }
        self.core.idle.borrow_mut().push(token.clone());
        self.observe_busy(at);
        self.core
            .resource_released
            .emit(&ResourceReleased { token, at }, ctx);
    }

    /// Total number of tokens, busy or idle.
    pub fn total_capacity(&self) -> usize {
        self.core.total_capacity
    }

    /// Tokens currently idle.
    pub fn available_count(&self) -> usize {
        self.core.idle.borrow().len()
    }

    /// Tokens currently handed out.
    pub fn busy_count(&self) -> usize {
        self.core.total_capacity - self.available_count()
    }

    /// Time-weighted busy-token statistics.
    pub fn counter(&self) -> Ref<'_, TimeWeightedCounter> {
        self.core.counter.borrow()
    }

    /// Signal fired on each successful acquisition.
    pub fn resource_acquired(&self) -> &Signal<ResourceAcquired<R>> {
        &self.core.resource_acquired
    }

    /// Signal fired on each successful release.
    pub fn resource_released(&self) -> &Signal<ResourceReleased<R>> {
        &self.core.resource_released
    }

    /// Signal fired when an acquisition finds the pool depleted.
    pub fn request_failed(&self) -> &Signal<RequestFailed> {
        &self.core.request_failed
    }

    /// Warm-up: restart the busy statistics at the current busy count.
    pub fn warmed_up(&self, at: SimTime) {
        let busy = self.busy_count() as f64;
        self.core.counter.borrow_mut().warmed_up(at, busy);
    }

    fn observe_busy(&self, at: SimTime) {
        let busy = self.busy_count() as f64;
        self.core
            .counter
            .borrow_mut()
            .observe_count(busy, at)
            .expect("simulation clock is nondecreasing");
    }
}
