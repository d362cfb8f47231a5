use glam::Vec3;

use crate::core::node::Node;

/// External force applied to the nodes of a vehicle every tick.
pub trait ForceGenerator: Send + Sync {
    fn apply(&self, node: &mut Node, dt: f32);
}

/// Constant force per unit mass, e.g. wind or a tow pull.
pub struct UniformForce {
    pub acceleration: Vec3,
}

impl UniformForce {
    pub fn new(acceleration: Vec3) -> Self {
        Self { acceleration }
    }
}

impl ForceGenerator for UniformForce {
    fn apply(&self, node: &mut Node, _dt: f32) {
        if node.is_static() {
            return;
        }
        node.apply_force(self.acceleration * node.mass());
    }
}

/// Quadratic drag resisting the direction of motion.
pub struct DragForce {
    pub drag_coefficient: f32,
}

impl ForceGenerator for DragForce {
    fn apply(&self, node: &mut Node, _dt: f32) {
        if node.is_static() {
            return;
        }

        let speed = node.velocity.length();
        if speed < 1e-6 {
            return;
        }

        let drag = -node.velocity * speed * self.drag_coefficient * node.surface_coef;
        node.apply_force(drag);
    }
}

/// Collection of forces applied to a vehicle's nodes each tick.
pub struct ForceRegistry {
    forces: Vec<Box<dyn ForceGenerator>>,
}

impl Default for ForceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ForceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceRegistry")
            .field("forces", &self.forces.len())
            .finish()
    }
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self { forces: Vec::new() }
    }

    pub fn add_force<F: ForceGenerator + 'static>(&mut self, force: F) {
        self.forces.push(Box::new(force));
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub fn apply_all(&self, nodes: &mut [Node], dt: f32) {
        for force in &self.forces {
            for node in nodes.iter_mut() {
                force.apply(node, dt);
            }
        }
    }
}
