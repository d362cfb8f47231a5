//! Error types for the simulation core.
//!
//! Errors are produced while a vehicle is being assembled or validated, and by
//! the explicit `try_*` coupling APIs. The per-tick path never returns them:
//! contested locks are silent no-ops and unstable nodes are clamped and
//! reported as [`SimEvent::NumericInstability`](crate::events::SimEvent).

use thiserror::Error;

use crate::utils::allocator::VehicleId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A node, beam, or other element index does not exist.
    #[error("{kind} index {index} out of range (len {len})")]
    OutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },
    /// A coupling or actuator was asked to make a transition it cannot make.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// NaN/Inf or runaway values were found in a node.
    #[error("numeric instability in {vehicle} at node {node}")]
    NumericInstability { vehicle: VehicleId, node: usize },
    /// A vehicle definition or engine setting failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),
    #[error("unknown ground model '{0}'")]
    UnknownGroundModel(String),
}

impl SimError {
    pub(crate) fn out_of_range(kind: &'static str, index: usize, len: usize) -> Self {
        Self::OutOfRange { kind, index, len }
    }
}

/// Convenient Result alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
