use serde::{Deserialize, Serialize};

use crate::core::ground::GroundModelId;
use crate::core::node::NodeId;

/// Construction style of a wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WheelType {
    None,
    #[default]
    Default,
    Wheel2,
    Flexbody,
}

/// Direction drive torque is applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Propulsion {
    #[default]
    None,
    Forward,
    Backward,
}

impl Propulsion {
    pub fn sign(self) -> f32 {
        match self {
            Propulsion::None => 0.0,
            Propulsion::Forward => 1.0,
            Propulsion::Backward => -1.0,
        }
    }
}

/// Rolling contact element made of rim nodes around an axle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wheel {
    /// Rim nodes; these receive drive, brake, and ground forces.
    pub nodes: Vec<NodeId>,
    pub axle_near: NodeId,
    pub axle_far: NodeId,
    pub radius: f32,
    pub wheel_type: WheelType,
    pub propulsion: Propulsion,
    pub braked: bool,

    /// Angular speed around the axle (rad/s), positive follows `axle_near -> axle_far`.
    pub angular_speed: f32,
    /// Ground model under the wheel during the last tick.
    pub ground: Option<GroundModelId>,
    /// Number of rim nodes touching the ground during the last tick.
    pub contact_count: u32,
    /// Friction coefficient applied to the rim during the last tick.
    pub friction: f32,
}

impl Wheel {
    pub fn new(nodes: Vec<NodeId>, axle_near: NodeId, axle_far: NodeId, radius: f32) -> Self {
        Self {
            nodes,
            axle_near,
            axle_far,
            radius,
            wheel_type: WheelType::Default,
            propulsion: Propulsion::None,
            braked: false,
            angular_speed: 0.0,
            ground: None,
            contact_count: 0,
            friction: 0.0,
        }
    }

    pub fn with_type(mut self, wheel_type: WheelType) -> Self {
        self.wheel_type = wheel_type;
        self
    }

    pub fn propelled(mut self, propulsion: Propulsion) -> Self {
        self.propulsion = propulsion;
        self
    }

    pub fn braked(mut self) -> Self {
        self.braked = true;
        self
    }

    /// Rolling speed at the rim (m/s).
    pub fn speed(&self) -> f32 {
        self.angular_speed * self.radius
    }

    pub fn in_contact(&self) -> bool {
        self.contact_count > 0
    }

    pub(crate) fn all_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .copied()
            .chain([self.axle_near, self.axle_far])
    }
}
