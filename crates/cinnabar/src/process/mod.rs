//! Reusable process primitives for queueing-network models.
//!
//! Each primitive is a cheap-clone handle over interior-mutable state: the
//! primitive exclusively owns that state, and the events it schedules carry
//! back-references into it. Primitives must not be shared across kernels;
//! each run uses fresh instances.

pub mod generator;
pub mod pool;
pub mod queue;
pub mod server;

use crate::time::SimTime;

/// Maximum simultaneous occupants of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// At most this many occupants; must be positive.
    Finite(usize),
    /// No limit.
    Unbounded,
}

impl Capacity {
    /// Validating constructor for the finite form.
    pub fn finite(limit: usize) -> crate::Result<Self> {
        if limit == 0 {
            return Err(crate::SimError::InvalidArgument(
                "capacity must be positive".to_string(),
            ));
        }
        Ok(Self::Finite(limit))
    }

    /// Remaining room given the current occupancy; `None` when unbounded.
    pub fn vacancy(self, occupancy: usize) -> Option<usize> {
        match self {
            Self::Finite(limit) => Some(limit.saturating_sub(occupancy)),
            Self::Unbounded => None,
        }
    }

    /// True when no room remains.
    pub fn is_full(self, occupancy: usize) -> bool {
        match self {
            Self::Finite(limit) => occupancy >= limit,
            Self::Unbounded => false,
        }
    }
}

/// A primitive's observable state changed at the given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChanged {
    /// Clock time of the change.
    pub at: SimTime,
}
