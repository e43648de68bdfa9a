//! Load generator: produces loads at sampled inter-arrival times.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::context::RunContext;
use crate::error::Result;
use crate::event::{Event, EventId};
use crate::rng::SimRng;
use crate::signal::Signal;
use crate::time::SimTime;

/// Configuration knobs for a [`Generator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Seed for the generator-local random stream.
    pub seed: u64,
    /// When true (the default), the first arrival after activation waits
    /// one sampled inter-arrival interval; when false it fires at the
    /// activation time itself.
    pub skip_first: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            skip_first: true,
        }
    }
}

impl GeneratorConfig {
    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets whether the first arrival waits one interval.
    pub fn with_skip_first(mut self, skip_first: bool) -> Self {
        self.skip_first = skip_first;
        self
    }
}

/// A load was produced at the given time.
#[derive(Debug, Clone)]
pub struct LoadGenerated<L> {
    /// The produced load.
    pub load: L,
    /// Clock time of production.
    pub at: SimTime,
}

#[derive(Debug, Clone)]
struct GeneratorState {
    is_active: bool,
    start_time: Option<SimTime>,
    loads_generated: u64,
}

struct GeneratorCore<L> {
    inter_arrival: Box<dyn Fn(&mut SimRng) -> SimTime>,
    factory: Box<dyn Fn(&mut SimRng) -> L>,
    skip_first: bool,
    rng: RefCell<SimRng>,
    state: RefCell<GeneratorState>,
    load_generated: Signal<LoadGenerated<L>>,
}

impl<L: 'static> GeneratorCore<L> {
    fn handle_start(self: &Rc<Self>, ctx: &RunContext) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            if state.is_active {
                debug!("generator start ignored: already active");
                return Ok(());
            }
            state.is_active = true;
            state.start_time = Some(ctx.clock());
            state.loads_generated = 0;
        }
        let delay = if self.skip_first {
            (self.inter_arrival)(&mut self.rng.borrow_mut())
        } else {
            0.0
        };
        ctx.schedule_in(Box::new(ArriveEvent { core: Rc::clone(self) }), delay)?;
        Ok(())
    }

    fn handle_stop(&self) {
        let mut state = self.state.borrow_mut();
        if !state.is_active {
            debug!("generator stop ignored: already inactive");
            return;
        }
        state.is_active = false;
    }

    fn handle_arrive(self: &Rc<Self>, ctx: &RunContext) -> Result<()> {
        if !self.state.borrow().is_active {
            // An arrival left in the FEL by a since-stopped generator.
            return Ok(());
        }
        let load = (self.factory)(&mut self.rng.borrow_mut());
        self.state.borrow_mut().loads_generated += 1;
        self.load_generated.emit(
            &LoadGenerated {
                load,
                at: ctx.clock(),
            },
            ctx,
        );
        let delay = (self.inter_arrival)(&mut self.rng.borrow_mut());
        ctx.schedule_in(Box::new(ArriveEvent { core: Rc::clone(self) }), delay)?;
        Ok(())
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let state = self.state.borrow();
        let mut map = serde_json::Map::new();
        map.insert("is_active".to_string(), state.is_active.into());
        map.insert(
            "loads_generated".to_string(),
            state.loads_generated.into(),
        );
        Some(map)
    }
}

struct StartEvent<L> {
    core: Rc<GeneratorCore<L>>,
}

impl<L: 'static> Event for StartEvent<L> {
    fn kind(&self) -> &'static str {
        "generator.start"
    }

    fn apply(&mut self, ctx: &RunContext) -> Result<()> {
        self.core.handle_start(ctx)
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.core.trace_details()
    }
}

struct StopEvent<L> {
    core: Rc<GeneratorCore<L>>,
}

impl<L: 'static> Event for StopEvent<L> {
    fn kind(&self) -> &'static str {
        "generator.stop"
    }

    fn apply(&mut self, _ctx: &RunContext) -> Result<()> {
        self.core.handle_stop();
        Ok(())
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.core.trace_details()
    }
}

struct ArriveEvent<L> {
    core: Rc<GeneratorCore<L>>,
}

impl<L: 'static> Event for ArriveEvent<L> {
    fn kind(&self) -> &'static str {
        "generator.arrive"
    }

    fn apply(&mut self, ctx: &RunContext) -> Result<()> {
        self.core.handle_arrive(ctx)
    }

    fn trace_details(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.core.trace_details()
    }
}

/// Produces loads at inter-arrival times drawn from a caller-supplied
/// sampler, using a caller-supplied factory.
///
/// Created inactive; [`Generator::initialize`] auto-schedules a start at
/// the current clock. A stopped generator can be reactivated later with
/// [`Generator::schedule_start`].
pub struct Generator<L> {
    core: Rc<GeneratorCore<L>>,
}

impl<L> Clone for Generator<L> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<L: 'static> Generator<L> {
    /// Creates a generator from samplers over its own seeded stream.
    ///
    /// `inter_arrival` returns durations in clock units; `factory`
    /// constructs one load per arrival.
    pub fn new(
        config: GeneratorConfig,
        inter_arrival: impl Fn(&mut SimRng) -> SimTime + 'static,
        factory: impl Fn(&mut SimRng) -> L + 'static,
    ) -> Self {
        Self {
            core: Rc::new(GeneratorCore {
                inter_arrival: Box::new(inter_arrival),
                factory: Box::new(factory),
                skip_first: config.skip_first,
                rng: RefCell::new(SimRng::new(config.seed)),
                state: RefCell::new(GeneratorState {
                    is_active: false,
                    start_time: None,
                    loads_generated: 0,
                }),
                load_generated: Signal::new(),
            }),
        }
    }

    /// Auto-schedules the activating start event at the current clock.
    pub fn initialize(&self, ctx: &RunContext) -> EventId {
        self.schedule_start(ctx)
    }

    /// Enqueues a start event at the current clock.
    pub fn schedule_start(&self, ctx: &RunContext) -> EventId {
        ctx.schedule_now(Box::new(StartEvent {
            core: Rc::clone(&self.core),
        }))
    }

    /// Enqueues a stop event at the current clock.
    pub fn schedule_stop(&self, ctx: &RunContext) -> EventId {
        ctx.schedule_now(Box::new(StopEvent {
            core: Rc::clone(&self.core),
        }))
    }

    /// Whether the generator is currently producing arrivals.
    pub fn is_active(&self) -> bool {
        self.core.state.borrow().is_active
    }

    /// Time of the most recent activation (or warm-up reset).
    pub fn start_time(&self) -> Option<SimTime> {
        self.core.state.borrow().start_time
    }

    /// Loads produced since activation (or warm-up reset).
    pub fn loads_generated(&self) -> u64 {
        self.core.state.borrow().loads_generated
    }

    /// Signal fired once per produced load.
    pub fn load_generated(&self) -> &Signal<LoadGenerated<L>> {
        &self.core.load_generated
    }

    /// Warm-up: restart the production counters without touching the
    /// active flag.
    pub fn warmed_up(&self, at: SimTime) {
        let mut state = self.core.state.borrow_mut();
        state.loads_generated = 0;
        state.start_time = Some(at);
    }
}
