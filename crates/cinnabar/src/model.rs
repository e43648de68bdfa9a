//! The top-level simulation model and its capability witnesses.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::context::RunContext;
use crate::error::Result;
use crate::time::SimTime;

/// Stable model identifier.
pub type ModelId = Uuid;

/// Capability for models whose statistics are reset at warm-up.
///
/// The kernel calls `warmed_up` at most once per run, the first time the
/// clock reaches the strategy's warm-up end time.
pub trait WarmupAware {
    /// Notifies the model that the warm-up interval has ended.
    fn warmed_up(&mut self, at: SimTime);
}

/// Top-level composite: holds process components, wires signal
/// subscriptions, and schedules initial events.
pub trait SimulationModel {
    /// Stable identity of this model.
    fn id(&self) -> ModelId;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Read-only metadata describing the model.
    fn metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Called exactly once before the run loop starts; schedules the
    /// initial events.
    fn initialize(&mut self, ctx: &RunContext) -> Result<()>;

    /// Capability witness: a model that needs warm-up notification
    /// returns itself here.
    fn warmup_aware(&mut self) -> Option<&mut dyn WarmupAware> {
        None
    }
}
