//! Multi-slot server: serves up to `capacity` concurrent loads.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use tracing::warn;

use crate::context::RunContext;
use crate::error::{Result, SimError};
use crate::event::Event;
use crate::process::StateChanged;
use crate::rng::SimRng;
use crate::signal::Signal;
use crate::stats::TimeWeightedCounter;
use crate::time::SimTime;

/// A load finished service and left the server.
#[derive(Debug, Clone)]
pub struct LoadDeparted<L> {
    /// The departing load.
    pub load: L,
    /// Clock time of the departure.
    pub at: SimTime,
}

struct ServerCore<L> {
    capacity: usize,
    service_time: Box<dyn Fn(&L, &mut SimRng) -> SimTime>,
    rng: RefCell<SimRng>,
    // Load → service start time. One map keeps the in-service set and the
    // start times in lockstep: entries appear and disappear together.
    in_service: RefCell<HashMap<L, SimTime>>,
    counter: RefCell<TimeWeightedCounter>,
    load_departed: Signal<LoadDeparted<L>>,
    state_changed: Signal<StateChanged>,
}

impl<L: Clone + Eq + Hash + Debug + 'static> ServerCore<L> {
    fn number_in_service(&self) -> usize {
        self.in_service.borrow().len()
    }

    fn observe_in_service(&self, now: SimTime) -> Result<()> {
        let count = self.number_in_service() as f64;
        self.counter.borrow_mut().observe_count(count, now)
    }

    fn handle_service_completion(&self, load: L, ctx: &RunContext) -> Result<()> {
        let now = ctx.clock();
        if self.in_service.borrow_mut().remove(&load).is_none() {
            return Err(SimError::InconsistentState(format!(
                "service completion for load not in service: {load:?}"
            )));
        }
        self.observe_in_service(now)?;
        self.load_departed.emit(&LoadDeparted { load, at: now }, ctx);
        self.state_changed.emit(&StateChanged { at: now }, ctx);
        Ok(())
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let mut map = serde_json::Map::new();
        map.insert(
            "number_in_service".to_string(),
            (self.number_in_service() as u64).into(),
        );
        map.insert("capacity".to_string(), (self.capacity as u64).into());
        Some(map)
    }
}

struct ServiceCompleteEvent<L> {
    core: Rc<ServerCore<L>>,
    load: Option<L>,
}

impl<L: Clone + Eq + Hash + Debug + 'static> Event for ServiceCompleteEvent<L> {
    fn kind(&self) -> &'static str {
        "server.service_complete"
    }

    fn apply(&mut self, ctx: &RunContext) -> Result<()> {
        let load = self.load.take().ok_or_else(|| {
            SimError::InconsistentState("service completion applied twice".to_string())
        })?;
        self.core.handle_service_completion(load, ctx)
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.core.trace_details()
    }
}

/// Serves up to `capacity` concurrent loads; per-load service durations
/// come from a caller-supplied sampler over the server's own seeded
/// stream.
pub struct Server<L> {
    core: Rc<ServerCore<L>>,
}

impl<L> Clone for Server<L> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<L: Clone + Eq + Hash + Debug + 'static> Server<L> {
    /// Creates a server; `capacity` must be positive.
    pub fn new(
        capacity: usize,
        seed: u64,
        service_time: impl Fn(&L, &mut SimRng) -> SimTime + 'static,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(SimError::InvalidArgument(
                "server capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            core: Rc::new(ServerCore {
                capacity,
                service_time: Box::new(service_time),
                rng: RefCell::new(SimRng::new(seed)),
                in_service: RefCell::new(HashMap::new()),
                counter: RefCell::new(TimeWeightedCounter::new()),
                load_departed: Signal::new(),
                state_changed: Signal::new(),
            }),
        })
    }

    /// Attempts to start serving a load.
    ///
    /// Synchronous fast-accept: with a free slot the load is recorded,
    /// its completion scheduled at `clock + service_time(load)`, a
    /// [`StateChanged`] emitted, and `true` returned. When full, returns
    /// `false` without side effects.
    pub fn try_start_service(&self, load: L, ctx: &RunContext) -> Result<bool> {
        let now = ctx.clock();
        {
            let in_service = self.core.in_service.borrow();
            if in_service.len() >= self.core.capacity {
                return Ok(false);
            }
            if in_service.contains_key(&load) {
                warn!(at = now, "start-service ignored: load already in service");
                return Ok(false);
            }
        }
        let duration = (self.core.service_time)(&load, &mut self.core.rng.borrow_mut());
        if !duration.is_finite() || duration < 0.0 {
            return Err(SimError::NegativeDelay(duration));
        }
        self.core.in_service.borrow_mut().insert(load.clone(), now);
        self.core.observe_in_service(now)?;
        ctx.schedule_in(
            Box::new(ServiceCompleteEvent {
                core: Rc::clone(&self.core),
                load: Some(load),
            }),
            duration,
        )?;
        self.core.state_changed.emit(&StateChanged { at: now }, ctx);
        Ok(true)
    }

    /// Configured number of slots.
    pub fn capacity(&self) -> usize {
        self.core.capacity
    }

    /// Loads currently in service.
    pub fn number_in_service(&self) -> usize {
        self.core.number_in_service()
    }

    /// Free slots.
    pub fn vacancy(&self) -> usize {
        self.core.capacity - self.core.number_in_service()
    }

    /// Snapshot of the in-flight loads.
    pub fn loads_in_service(&self) -> Vec<L> {
        self.core.in_service.borrow().keys().cloned().collect()
    }

    /// Read-only projection of per-load service start times.
    pub fn service_start_times(&self) -> HashMap<L, SimTime> {
        self.core.in_service.borrow().clone()
    }

    /// Time-weighted in-service statistics.
    pub fn counter(&self) -> Ref<'_, TimeWeightedCounter> {
        self.core.counter.borrow()
    }

    /// Signal fired when a load finishes service.
    pub fn load_departed(&self) -> &Signal<LoadDeparted<L>> {
        &self.core.load_departed
    }

    /// Signal fired after any observable state change.
    pub fn state_changed(&self) -> &Signal<StateChanged> {
        &self.core.state_changed
    }

    /// Warm-up: in-flight loads restart their service clocks at `at`, so
    /// downstream flow-time metrics use the post-warm-up window.
    pub fn warmed_up(&self, at: SimTime) {
        for start in self.core.in_service.borrow_mut().values_mut() {
            *start = at;
        }
        let count = self.core.number_in_service() as f64;
        self.core.counter.borrow_mut().warmed_up(at, count);
    }
}
