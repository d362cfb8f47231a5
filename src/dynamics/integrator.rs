use glam::Vec3;

use crate::config::SimConfig;
use crate::core::node::{Node, NodeId};

/// Nodes that failed the numeric guard during an integration pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IntegrationReport {
    pub unstable: Vec<NodeId>,
}

impl IntegrationReport {
    pub fn is_stable(&self) -> bool {
        self.unstable.is_empty()
    }
}

/// Semi-implicit Euler integrator for node point masses.
#[derive(Debug, Clone, Copy)]
pub struct NodeIntegrator {
    pub dt: f32,
    pub max_speed: f32,
    pub max_position: f32,
}

impl NodeIntegrator {
    pub fn new(dt: f32, max_speed: f32, max_position: f32) -> Self {
        Self {
            dt,
            max_speed,
            max_position,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.time_step, config.max_node_speed, config.max_position)
    }

    /// Adds `gravity * mass` to every dynamic node.
    pub fn apply_gravity(&self, nodes: &mut [Node], gravity: Vec3) {
        for node in nodes.iter_mut().filter(|n| !n.is_static()) {
            node.forces += gravity * node.mass();
        }
    }

    /// `v += F/m dt; x += v dt`, then clears forces.
    ///
    /// A node whose new state is non-finite or outside `max_position` keeps its
    /// previous position, loses its velocity, and is reported as unstable.
    pub fn integrate(&self, nodes: &mut [Node]) -> IntegrationReport {
        let mut report = IntegrationReport::default();
        for (index, node) in nodes.iter_mut().enumerate() {
            if node.is_static() {
                node.velocity = Vec3::ZERO;
                node.forces = Vec3::ZERO;
                continue;
            }

            let mut velocity = node.velocity + node.forces * (node.inverse_mass() * self.dt);
            let speed = velocity.length();
            if speed > self.max_speed {
                velocity *= self.max_speed / speed;
            }
            let position = node.position + velocity * self.dt;
            node.forces = Vec3::ZERO;

            if !(position.is_finite() && velocity.is_finite())
                || position.abs().max_element() > self.max_position
            {
                node.velocity = Vec3::ZERO;
                report.unstable.push(NodeId::from(index));
                continue;
            }
            node.velocity = velocity;
            node.position = position;
        }
        report
    }
}
