//! Per-tick dynamics: beam forces, actuators, ground contact, wheels,
//! triggers and node integration.

pub mod actuators;
pub mod beams;
pub mod contact;
pub mod forces;
pub mod friction;
pub mod integrator;
pub mod rotational;
pub mod triggers;
pub mod wheels;

use crate::collision::terrain::TerrainQuery;
use crate::config::SimConfig;
use crate::core::ground::GroundModelRegistry;

pub use beams::{accumulate_beam_forces, evaluate_beam, spring_damper, BeamReport, SpringDamper};
pub use forces::{DragForce, ForceGenerator, ForceRegistry, UniformForce};
pub use friction::{friction_coefficient, ground_response, FrictionRegime, GroundResponse};
pub use integrator::{IntegrationReport, NodeIntegrator};

/// Everything a vehicle needs from the world during one tick.
///
/// Passed explicitly to each phase; shared read-only between worker threads.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a SimConfig,
    pub grounds: &'a GroundModelRegistry,
    pub terrain: &'a dyn TerrainQuery,
    pub dt: f32,
}

impl<'a> StepContext<'a> {
    pub fn new(
        config: &'a SimConfig,
        grounds: &'a GroundModelRegistry,
        terrain: &'a dyn TerrainQuery,
    ) -> Self {
        Self {
            config,
            grounds,
            terrain,
            dt: config.time_step,
        }
    }

    /// Magnitude of gravity, used for buoyancy.
    pub fn gravity(&self) -> f32 {
        self.config.gravity.length()
    }
}
