//! softrig – soft-body vehicle physics for Rust.
//!
//! Vehicles are point-mass nodes connected by spring-damper beams. Shocks,
//! hydros, command beams, rotators and rigidifiers act on that structure;
//! wheels and nodes meet the terrain through ground models with Stribeck
//! friction and fluid drag; hooks, ropes and ties couple vehicles together.
//! The [`SimulationWorld`] advances every vehicle at a fixed timestep and
//! reports discrete happenings through an [`EventSink`].

pub mod collision;
pub mod config;
pub mod core;
pub mod coupling;
pub mod dynamics;
pub mod error;
pub mod events;
pub mod utils;
pub mod vehicle;
pub mod world;

pub use glam::{Quat, Vec3};

pub use collision::{BoxTerrain, CollisionBox, FlatGround, GroundContact, NoTerrain, TerrainQuery};
pub use config::SimConfig;
pub use core::{
    actuator::{Command, Rigidifier, Rotator},
    beam::{Beam, BeamId, BeamKind, Bounded, HydroFlags},
    ground::{GroundModel, GroundModelId, GroundModelRegistry},
    node::{Node, NodeId, NodeRef},
    prop::{AnimationInputs, Prop},
    shock::{Shock, ShockFlags},
    trigger::{EngineTrigger, Trigger, TriggerRole},
    wheel::Wheel,
};
pub use coupling::{CouplingIntent, CouplingKind, CouplingRequest, Hook, LockState, Ropable, Rope, Tie};
pub use dynamics::{DragForce, ForceGenerator, UniformForce};
pub use error::{Result, SimError};
pub use events::{EventQueue, EventSink, NullSink, SimEvent};
pub use utils::allocator::VehicleId;
pub use vehicle::{SimState, Vehicle, VehicleInputs, VehicleSnapshot};
pub use world::{OverrideQueue, PositionOverride, SimulationWorld};

/// High-level convenience wrapper that owns a [`SimulationWorld`].
pub struct Simulation {
    world: SimulationWorld,
}

impl Simulation {
    /// Creates a simulation with the provided settings.
    pub fn new(config: SimConfig) -> Result<Self> {
        Ok(Self {
            world: SimulationWorld::new(config)?,
        })
    }

    /// Validates and adds a vehicle, returning its [`VehicleId`].
    pub fn spawn(&mut self, vehicle: Vehicle) -> Result<VehicleId> {
        self.world.spawn(vehicle)
    }

    /// Advances the simulation by the provided delta time.
    pub fn step(&mut self, dt: f32) -> u32 {
        self.world.step(dt)
    }

    /// Enables or disables stepping vehicles on the rayon pool.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.world.set_parallel_enabled(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.world.parallel_enabled()
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.world.vehicle(id)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.world.vehicle_mut(id)
    }

    /// Drains the events emitted since the last call.
    pub fn drain_events(&self) -> Vec<SimEvent> {
        self.world.events().drain()
    }

    pub fn world(&self) -> &SimulationWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimulationWorld {
        &mut self.world
    }
}
