//! # cinnabar: Discrete-Event Simulation Kernel & Process Primitives
//!
//! This crate provides a deterministic discrete-event simulation (DES)
//! kernel plus the reusable process components (load generator,
//! capacity-limited FIFO queue, multi-slot server, reusable-token
//! resource pool) that let models describe queueing networks without
//! writing any scheduling code.
//!
//! ## Philosophy
//!
//! - **Reproducibility**: same seed → same event sequence → same metrics
//! - **Single-threaded cooperative dispatch**: handlers run to completion;
//!   the only way to wait is to schedule a follow-on event
//! - **Signals over errors**: expected outcomes (a balked load, a depleted
//!   pool) are typed notifications, never faults
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      Simulation Kernel                        │
//! │  ┌────────────┐   ┌────────────────┐   ┌───────────────────┐  │
//! │  │ SimClock   │   │ FutureEventList│   │ RunStrategy       │  │
//! │  │ (virtual)  │   │ (time, seq)    │   │ (stop predicate)  │  │
//! │  └────────────┘   └────────────────┘   └───────────────────┘  │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │                  Process Primitives                     │  │
//! │  │   Generator    FifoQueue    Server    ResourcePool      │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │   TimeWeightedCounter        Tracer / TraceRecord       │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use cinnabar::{
//!     ConditionalStrategy, RunProfile, SimulationKernel,
//! };
//!
//! let mut kernel = SimulationKernel::new(
//!     RunProfile::new("checkout"),
//!     Box::new(model),
//!     Box::new(ConditionalStrategy::new(|ctx| ctx.clock() < 480.0)),
//! );
//! let result = kernel.run()?;
//! println!("{}", result.to_json_pretty()?);
//! ```
//!
//! ## Key Concepts
//!
//! - **[`SimulationKernel`]**: owns the clock, the FEL, and the run loop;
//!   one-shot, so each run uses a fresh instance
//! - **[`Event`]**: unit of state change, dispatched in `(time, sequence)`
//!   order with FIFO tie-break
//! - **[`RunStrategy`]**: continuation predicate, optionally declaring a
//!   warm-up end time
//! - **[`TimeWeightedCounter`]**: count-over-time statistics behind every
//!   primitive's utilization numbers
//! - **[`SimRng`]**: seeded random streams; fork per primitive for
//!   independent, reproducible draws

mod clock;
mod context;
mod error;
mod event;
mod kernel;
mod model;
pub mod process;
mod result;
mod rng;
mod scheduler;
mod signal;
mod stats;
mod strategy;
mod time;
mod trace;

#[cfg(test)]
mod tests;

pub use clock::SimClock;
pub use context::RunContext;
pub use error::{Result, SimError};
pub use event::{Event, EventId};
pub use kernel::{RunProfile, SimulationKernel};
pub use model::{ModelId, SimulationModel, WarmupAware};
pub use process::generator::{Generator, GeneratorConfig, LoadGenerated};
pub use process::pool::{RequestFailed, ResourceAcquired, ResourcePool, ResourceReleased};
pub use process::queue::{FifoQueue, LoadBalked, LoadDequeued, LoadEnqueued};
pub use process::server::{LoadDeparted, Server};
pub use process::{Capacity, StateChanged};
pub use result::RunResult;
pub use rng::SimRng;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use signal::Signal;
pub use stats::{HistogramBin, TimeWeightedCounter};
pub use strategy::{AbsoluteTimeStrategy, ConditionalStrategy, DurationStrategy, RunStrategy};
pub use time::{SimTime, SimulationTimeUnit};
pub use trace::{InMemoryTracer, TracePoint, TraceRecord, Tracer};
