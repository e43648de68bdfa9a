//! The simulation kernel: clock, FEL, and the run loop.

use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use crate::context::RunContext;
use crate::error::{Result, SimError};
use crate::model::SimulationModel;
use crate::result::RunResult;
use crate::scheduler::SchedulerHandle;
use crate::strategy::RunStrategy;
use crate::time::{SimTime, SimulationTimeUnit};
use crate::trace::{TracePoint, Tracer};

/// Construction-time description of a run: a name plus the clock unit
/// duration-typed delays convert through.
#[derive(Debug, Clone)]
pub struct RunProfile {
    name: String,
    time_unit: SimulationTimeUnit,
}

impl RunProfile {
    /// Creates a profile with the given name, clocked in seconds.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_unit: SimulationTimeUnit::Seconds,
        }
    }

    /// Sets the clock unit.
    pub fn with_time_unit(mut self, time_unit: SimulationTimeUnit) -> Self {
        self.time_unit = time_unit;
        self
    }

    /// Profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clock unit.
    pub fn time_unit(&self) -> SimulationTimeUnit {
        self.time_unit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KernelState {
    Unstarted,
    Running,
    Finished,
}

/// One-shot discrete-event simulation kernel.
///
/// Owns the clock, the FEL, and the sequence counter; implements the
/// scheduler contract through the context it hands to the model and to
/// events. Each run consumes the kernel: a second `run` fails with
/// `InvalidState`, so deterministic replay always starts from a fresh
/// instance.
pub struct SimulationKernel {
    profile: RunProfile,
    model: Box<dyn SimulationModel>,
    strategy: Box<dyn RunStrategy>,
    scheduler: SchedulerHandle,
    state: KernelState,
}

impl SimulationKernel {
    /// Creates a kernel over the given model and strategy.
    pub fn new(
        profile: RunProfile,
        model: Box<dyn SimulationModel>,
        strategy: Box<dyn RunStrategy>,
    ) -> Self {
        let scheduler = SchedulerHandle::new(profile.time_unit());
        Self {
            profile,
            model,
            strategy,
            scheduler,
            state: KernelState::Unstarted,
        }
    }

    /// Installs a tracer receiving scheduled/executing/completed records.
    pub fn with_tracer(self, tracer: Box<dyn Tracer>) -> Self {
        self.scheduler.set_tracer(Some(tracer));
        self
    }

    /// Profile this kernel was built from.
    pub fn profile(&self) -> &RunProfile {
        &self.profile
    }

    /// Executes one full simulation.
    ///
    /// Initializes the model, then dispatches events in `(time, sequence)`
    /// order until the strategy denies continuation or the FEL empties.
    /// Fails with `InvalidState` when called twice on the same instance.
    pub fn run(&mut self) -> Result<RunResult> {
        if self.state != KernelState::Unstarted {
            return Err(SimError::InvalidState(
                "simulation kernel has already run".to_string(),
            ));
        }
        self.state = KernelState::Running;
        let started = Instant::now();
        let ctx = RunContext::new(self.scheduler.clone());

        debug!(profile = %self.profile.name, model = %self.model.name(), "run starting");

        let outcome = self
            .model
            .initialize(&ctx)
            .map_err(|source| SimError::InitFailed {
                source: Box::new(source),
            })
            .and_then(|()| self.run_loop(&ctx));

        self.state = KernelState::Finished;

        match outcome {
            Ok(()) => {
                let result = RunResult {
                    profile_run_id: Uuid::new_v4(),
                    profile_name: self.profile.name.clone(),
                    final_clock_time: self.scheduler.clock(),
                    executed_event_count: self.scheduler.executed_events(),
                    real_time_duration: started.elapsed(),
                    model_id: self.model.id(),
                    model_name: self.model.name().to_string(),
                };
                debug!(
                    final_clock = result.final_clock_time,
                    executed = result.executed_event_count,
                    "run finished"
                );
                Ok(result)
            }
            Err(err) => {
                debug!(error = %err, "run failed");
                Err(err)
            }
        }
    }

    fn run_loop(&mut self, ctx: &RunContext) -> Result<()> {
        let warmup_end = self.strategy.warmup_end_time();
        let mut warmup_notified = false;

        loop {
            if !self.strategy.should_continue(ctx) {
                break;
            }
            // pop_next verifies the entry is not behind the clock and
            // advances the clock to its execution time.
            let Some(mut entry) = self.scheduler.pop_next()? else {
                break;
            };

            if let Some(end) = warmup_end {
                if !warmup_notified && entry.time >= end {
                    self.notify_warmup(entry.time, &mut warmup_notified);
                }
            }

            self.scheduler
                .trace_dispatch(TracePoint::EventExecuting, &entry);

            entry
                .event
                .apply(ctx)
                .map_err(|source| SimError::EventFailed {
                    event_id: entry.id,
                    at: entry.time,
                    source: Box::new(source),
                })?;

            self.scheduler
                .trace_dispatch(TracePoint::EventCompleted, &entry);
            self.scheduler.increment_executed();
        }
        Ok(())
    }

    fn notify_warmup(&mut self, at: SimTime, warmup_notified: &mut bool) {
        if let Some(aware) = self.model.warmup_aware() {
            debug!(at, "warm-up end reached, notifying model");
            aware.warmed_up(at);
            *warmup_notified = true;
        }
    }
}
