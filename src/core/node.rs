use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::ground::GroundModelId;
use crate::utils::allocator::VehicleId;

/// Index of a node inside its vehicle. Stable for the vehicle's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

/// A node addressed across vehicles, used by couplings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub vehicle: VehicleId,
    pub node: NodeId,
}

/// Moisture state of a node, polled by effects collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Moisture {
    #[default]
    Dry,
    Dripping,
    Wet,
}

/// A point mass of the deformable structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Force accumulated during the current tick; cleared by the integrator.
    pub forces: Vec3,
    mass: f32,
    inverse_mass: f32,
    /// Multiplier on ground friction for this node.
    pub friction_coef: f32,
    /// Fluid drag surface coefficient.
    pub surface_coef: f32,
    /// Buoyancy volume coefficient.
    pub volume_coef: f32,
    /// Whether the node takes part in ground contact.
    pub collides: bool,
    /// Hooks with a matching lock group may lock onto this node.
    pub lock_group: Option<u32>,
    pub moisture: Moisture,
    /// Seconds spent dripping since leaving a fluid.
    pub wet_time: f32,
    /// Ground model touched during the last tick.
    pub contact_ground: Option<GroundModelId>,
    /// Friction coefficient applied during the last tick.
    pub contact_friction: f32,
}

impl Node {
    pub fn new(position: Vec3, mass: f32) -> Self {
        let mut node = Self {
            position,
            velocity: Vec3::ZERO,
            forces: Vec3::ZERO,
            mass: 0.0,
            inverse_mass: 0.0,
            friction_coef: 1.0,
            surface_coef: 1.0,
            volume_coef: 1.0,
            collides: true,
            lock_group: None,
            moisture: Moisture::Dry,
            wet_time: 0.0,
            contact_ground: None,
            contact_friction: 0.0,
        };
        node.set_mass(mass);
        node
    }

    /// An immovable anchor node.
    pub fn fixed(position: Vec3) -> Self {
        Self::new(position, 0.0)
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_collision(mut self, collides: bool) -> Self {
        self.collides = collides;
        self
    }

    pub fn with_lock_group(mut self, group: u32) -> Self {
        self.lock_group = Some(group);
        self
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    /// Sets the mass; zero or negative mass makes the node static.
    pub fn set_mass(&mut self, mass: f32) {
        if mass > f32::EPSILON && mass.is_finite() {
            self.mass = mass;
            self.inverse_mass = 1.0 / mass;
        } else {
            self.mass = 0.0;
            self.inverse_mass = 0.0;
        }
    }

    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    #[inline]
    pub fn apply_force(&mut self, force: Vec3) {
        self.forces += force;
    }

    /// Advances the moisture state after this tick's contact evaluation.
    pub fn update_moisture(&mut self, in_fluid: bool, dt: f32, drip_time: f32) {
        if in_fluid {
            self.moisture = Moisture::Wet;
            self.wet_time = 0.0;
            return;
        }
        match self.moisture {
            Moisture::Wet => {
                self.moisture = Moisture::Dripping;
                self.wet_time = 0.0;
            }
            Moisture::Dripping => {
                self.wet_time += dt;
                if self.wet_time > drip_time {
                    self.moisture = Moisture::Dry;
                    self.wet_time = 0.0;
                }
            }
            Moisture::Dry => {}
        }
    }
}
