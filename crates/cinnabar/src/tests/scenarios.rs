//! End-to-end scenarios over the kernel and the process primitives.

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use crate::context::RunContext;
use crate::error::Result;
use crate::event::Event;
use crate::model::{ModelId, SimulationModel, WarmupAware};
use crate::process::Capacity;
use crate::process::generator::{Generator, GeneratorConfig};
use crate::process::pool::ResourcePool;
use crate::process::queue::FifoQueue;
use crate::process::server::Server;
use crate::strategy::{ConditionalStrategy, DurationStrategy};
use crate::time::SimTime;
use crate::trace::{InMemoryTracer, TracePoint};
use crate::kernel::{RunProfile, SimulationKernel};

/// Event that runs an arbitrary closure at its execution time.
struct Call {
    name: &'static str,
    action: Box<dyn FnMut(&RunContext) -> Result<()>>,
}

impl Call {
    fn new(name: &'static str, action: impl FnMut(&RunContext) -> Result<()> + 'static) -> Self {
        Self {
            name,
            action: Box::new(action),
        }
    }
}

impl Event for Call {
    fn kind(&self) -> &'static str {
        self.name
    }

    fn apply(&mut self, ctx: &RunContext) -> Result<()> {
        (self.action)(ctx)
    }
}

/// Model assembled from closures, for scripting scenarios.
struct HarnessModel {
    id: ModelId,
    init: Box<dyn FnMut(&RunContext) -> Result<()>>,
    on_warmup: Option<Box<dyn FnMut(SimTime)>>,
}

impl HarnessModel {
    fn new(init: impl FnMut(&RunContext) -> Result<()> + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            init: Box::new(init),
            on_warmup: None,
        }
    }

    fn with_warmup(mut self, on_warmup: impl FnMut(SimTime) + 'static) -> Self {
        self.on_warmup = Some(Box::new(on_warmup));
        self
    }
}

impl SimulationModel for HarnessModel {
    fn id(&self) -> ModelId {
        self.id
    }

    fn name(&self) -> &str {
        "harness"
    }

    fn initialize(&mut self, ctx: &RunContext) -> Result<()> {
        (self.init)(ctx)
    }

    fn warmup_aware(&mut self) -> Option<&mut dyn WarmupAware> {
        if self.on_warmup.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl WarmupAware for HarnessModel {
    fn warmed_up(&mut self, at: SimTime) {
        if let Some(on_warmup) = self.on_warmup.as_mut() {
            on_warmup(at);
        }
    }
}

fn run_forever(model: HarnessModel) -> crate::result::RunResult {
    let mut kernel = SimulationKernel::new(
        RunProfile::new("scenario"),
        Box::new(model),
        Box::new(ConditionalStrategy::new(|_| true)),
    );
    kernel.run().expect("scenario run succeeds")
}

#[test]
fn two_events_at_the_same_time_dispatch_in_scheduling_order() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let model = {
        let order = Rc::clone(&order);
        HarnessModel::new(move |ctx| {
            for name in ["A", "B"] {
                let order = Rc::clone(&order);
                ctx.schedule_at(
                    Box::new(Call::new("scenario.tie", move |_| {
                        order.borrow_mut().push(name);
                        Ok(())
                    })),
                    2.0,
                )?;
            }
            Ok(())
        })
    };

    let result = run_forever(model);

    assert_eq!(*order.borrow(), vec!["A", "B"]);
    assert_eq!(result.final_clock_time, 2.0);
    assert_eq!(result.executed_event_count, 2);
}

#[test]
fn clock_advances_through_out_of_order_schedules() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let model = {
        let order = Rc::clone(&order);
        HarnessModel::new(move |ctx| {
            for at in [3.0, 1.0, 2.0] {
                let order = Rc::clone(&order);
                ctx.schedule_at(
                    Box::new(Call::new("scenario.clock", move |ctx| {
                        order.borrow_mut().push(ctx.clock());
                        Ok(())
                    })),
                    at,
                )?;
            }
            Ok(())
        })
    };

    let result = run_forever(model);

    assert_eq!(*order.borrow(), vec![1.0, 2.0, 3.0]);
    assert_eq!(result.final_clock_time, 3.0);
}

#[test]
fn duration_strategy_notifies_warmup_exactly_once() {
    let warmed = Rc::new(RefCell::new(Vec::new()));
    let model = {
        let warmed = Rc::clone(&warmed);
        HarnessModel::new(|ctx| {
            ctx.schedule_at(Box::new(Call::new("scenario.warm", |_| Ok(()))), 5.0)?;
            Ok(())
        })
        .with_warmup(move |at| warmed.borrow_mut().push(at))
    };

    let strategy = DurationStrategy::new(10.0)
        .expect("valid duration")
        .with_warmup(5.0)
        .expect("valid warmup");
    let mut kernel = SimulationKernel::new(
        RunProfile::new("scenario"),
        Box::new(model),
        Box::new(strategy),
    );
    let result = kernel.run().expect("run succeeds");

    assert_eq!(*warmed.borrow(), vec![5.0]);
    assert_eq!(result.executed_event_count, 1);
    assert_eq!(result.final_clock_time, 5.0);
}

#[test]
fn finite_queue_balks_the_third_arrival() {
    let queue = FifoQueue::new(Capacity::finite(2).expect("valid"));
    let accepted = Rc::new(RefCell::new(Vec::new()));
    let balked = Rc::new(RefCell::new(Vec::new()));
    {
        let balked = Rc::clone(&balked);
        queue
            .load_balked()
            .connect(move |signal, _ctx| balked.borrow_mut().push((signal.load, signal.at)));
    }

    let model = {
        let queue = queue.clone();
        let accepted = Rc::clone(&accepted);
        HarnessModel::new(move |ctx| {
            for load in ["L1", "L2", "L3"] {
                accepted
                    .borrow_mut()
                    .push(queue.try_schedule_enqueue(load, ctx));
            }
            Ok(())
        })
    };

    run_forever(model);

    assert_eq!(*accepted.borrow(), vec![true, true, false]);
    assert_eq!(*balked.borrow(), vec![("L3", 0.0)]);
    assert_eq!(queue.occupancy(), 2);
    assert_eq!(queue.waiting_items(), vec!["L1", "L2"]);
}

#[test]
fn server_completes_service_ten_seconds_after_acceptance() {
    let server = Server::new(1, 0, |_load: &&str, _rng| 10.0).expect("valid capacity");
    let state_changes = Rc::new(RefCell::new(Vec::new()));
    let departures = Rc::new(RefCell::new(Vec::new()));
    {
        let state_changes = Rc::clone(&state_changes);
        server
            .state_changed()
            .connect(move |signal, _ctx| state_changes.borrow_mut().push(signal.at));
    }
    {
        let departures = Rc::clone(&departures);
        server
            .load_departed()
            .connect(move |signal, _ctx| departures.borrow_mut().push((signal.load, signal.at)));
    }

    let model = {
        let server = server.clone();
        HarnessModel::new(move |ctx| {
            let server = server.clone();
            ctx.schedule_at(
                Box::new(Call::new("scenario.accept", move |ctx| {
                    assert!(server.try_start_service("job", ctx)?);
                    Ok(())
                })),
                10.0,
            )?;
            Ok(())
        })
    };

    let result = run_forever(model);

    assert_eq!(*state_changes.borrow(), vec![10.0, 20.0]);
    assert_eq!(*departures.borrow(), vec![("job", 20.0)]);
    assert_eq!(server.number_in_service(), 0);
    assert_eq!(result.final_clock_time, 20.0);
}

#[test]
fn pool_reuses_the_most_recently_released_token() {
    let pool = ResourcePool::new(vec!["R1", "R2", "R3"]);
    let observed = Rc::new(RefCell::new(Vec::new()));

    let model = {
        let pool = pool.clone();
        let observed = Rc::clone(&observed);
        HarnessModel::new(move |ctx| {
            for _ in 0..3 {
                observed
                    .borrow_mut()
                    .push(pool.try_acquire(ctx).expect("token available"));
            }
            pool.release("R2", ctx);
            observed
                .borrow_mut()
                .push(pool.try_acquire(ctx).expect("token available"));
            Ok(())
        })
    };

    run_forever(model);

    assert_eq!(*observed.borrow(), vec!["R3", "R2", "R1", "R2"]);
    assert_eq!(pool.busy_count(), 3);
}

/// Generator → queue → single-slot server pipeline wired entirely through
/// signals: arrivals enqueue, the idle server pulls from the queue, and
/// departures poke the queue again.
fn run_pipeline(seed: u64) -> (Vec<(u64, SimTime)>, f64, u64) {
    let generator = Generator::new(
        GeneratorConfig::default().with_seed(seed),
        |rng| rng.exp(2.0),
        {
            let next = std::cell::Cell::new(0u64);
            move |_| {
                let id = next.get();
                next.set(id + 1);
                id
            }
        },
    );
    let queue = FifoQueue::new(Capacity::finite(8).expect("valid"));
    let server = Server::new(1, seed.wrapping_add(1), |_load, rng| rng.exp(1.5))
        .expect("valid capacity");

    // Arrivals flow into the queue.
    {
        let queue = queue.clone();
        generator.load_generated().connect(move |signal, ctx| {
            queue.try_schedule_enqueue(signal.load, ctx);
        });
    }
    // A newly queued load wakes the (possibly idle) server.
    {
        let queue = queue.clone();
        let server = server.clone();
        queue.clone().load_enqueued().connect(move |_signal, ctx| {
            if server.vacancy() > 0 {
                queue.trigger_dequeue_attempt(ctx);
            }
        });
    }
    // Dequeued loads enter service.
    {
        let server = server.clone();
        queue.load_dequeued().connect(move |signal, ctx| {
            server
                .try_start_service(signal.load, ctx)
                .expect("service starts");
        });
    }
    // Departures pull the next waiting load.
    let departures = Rc::new(RefCell::new(Vec::new()));
    {
        let queue = queue.clone();
        let departures = Rc::clone(&departures);
        server.load_departed().connect(move |signal, ctx| {
            departures.borrow_mut().push((signal.load, signal.at));
            queue.trigger_dequeue_attempt(ctx);
        });
    }

    let model = {
        let generator = generator.clone();
        HarnessModel::new(move |ctx| {
            generator.initialize(ctx);
            Ok(())
        })
    };

    let strategy = DurationStrategy::new(200.0).expect("valid duration");
    let mut kernel = SimulationKernel::new(
        RunProfile::new("pipeline"),
        Box::new(model),
        Box::new(strategy),
    );
    let result = kernel.run().expect("pipeline runs");

    let log = departures.borrow().clone();
    (log, queue.counter().average_count(), result.executed_event_count)
}

#[test]
fn pipeline_serves_loads_in_arrival_order() {
    let (departures, _, _) = run_pipeline(7);
    assert!(!departures.is_empty());
    let ids: Vec<u64> = departures.iter().map(|(id, _)| *id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);

    let times: Vec<SimTime> = departures.iter().map(|(_, at)| *at).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn pipeline_is_deterministic_for_a_fixed_seed() {
    assert_eq!(run_pipeline(11), run_pipeline(11));
    assert_ne!(run_pipeline(11).0, run_pipeline(13).0);
}

#[test]
fn tracer_records_one_executing_per_dispatch() {
    let tracer = InMemoryTracer::new();
    let model = HarnessModel::new(|ctx| {
        for at in [1.0, 2.0] {
            ctx.schedule_at(Box::new(Call::new("scenario.traced", |_| Ok(()))), at)?;
        }
        Ok(())
    });

    let mut kernel = SimulationKernel::new(
        RunProfile::new("traced"),
        Box::new(model),
        Box::new(ConditionalStrategy::new(|_| true)),
    )
    .with_tracer(Box::new(tracer.clone()));
    let result = kernel.run().expect("run succeeds");

    let executing = tracer
        .records()
        .iter()
        .filter(|r| r.point == TracePoint::EventExecuting)
        .count() as u64;
    assert_eq!(executing, result.executed_event_count);
}
