use glam::Vec3;

use crate::core::beam::{Beam, BeamId, DEFAULT_DETACHER_GROUP};
use crate::core::node::{Node, NodeId};
use crate::error::{Result, SimError};

/// Index-stable storage for the nodes and beams of one vehicle.
///
/// Nodes and beams are only appended while a vehicle is assembled. During
/// simulation the layout never changes; beams are disabled instead of removed.
#[derive(Debug, Clone, Default)]
pub struct NodeBeamStore {
    nodes: Vec<Node>,
    beams: Vec<Beam>,
}

impl NodeBeamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, beams: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            beams: Vec::with_capacity(beams),
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId::from(self.nodes.len() - 1)
    }

    /// Adds a beam between two existing nodes. Coupling beams may leave
    /// `node_b` equal to `node_a`; their far end is attached later.
    pub fn add_beam(&mut self, mut beam: Beam) -> Result<BeamId> {
        let pa = self.node(beam.node_a)?.position;
        let pb = self.node(beam.node_b)?.position;
        if beam.node_a == beam.node_b && !beam.disabled {
            return Err(SimError::InvalidConfig(format!(
                "beam connects node {} to itself",
                beam.node_a.0
            )));
        }
        if !(beam.k >= 0.0 && beam.d >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "beam {}-{} has negative spring or damping",
                beam.node_a.0, beam.node_b.0
            )));
        }
        beam.settle_lengths(pa.distance(pb));
        self.beams.push(beam);
        Ok(BeamId::from(self.beams.len() - 1))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        let len = self.nodes.len();
        self.nodes
            .get(id.index())
            .ok_or(SimError::out_of_range("node", id.index(), len))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(id.index())
            .ok_or(SimError::out_of_range("node", id.index(), len))
    }

    pub fn beam(&self, id: BeamId) -> Result<&Beam> {
        let len = self.beams.len();
        self.beams
            .get(id.index())
            .ok_or(SimError::out_of_range("beam", id.index(), len))
    }

    pub fn beam_mut(&mut self, id: BeamId) -> Result<&mut Beam> {
        let len = self.beams.len();
        self.beams
            .get_mut(id.index())
            .ok_or(SimError::out_of_range("beam", id.index(), len))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn beams_mut(&mut self) -> &mut [Beam] {
        &mut self.beams
    }

    /// Both arrays at once, for passes that read nodes while writing beams.
    pub fn split_mut(&mut self) -> (&mut [Node], &mut [Beam]) {
        (&mut self.nodes, &mut self.beams)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn beam_count(&self) -> usize {
        self.beams.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn contains_beam(&self, id: BeamId) -> bool {
        id.index() < self.beams.len()
    }

    pub fn for_each_beam_in_detacher_group<F>(&mut self, group: u32, mut f: F)
    where
        F: FnMut(BeamId, &mut Beam),
    {
        for (index, beam) in self.beams.iter_mut().enumerate() {
            if beam.detacher_group == group {
                f(BeamId::from(index), beam);
            }
        }
    }

    /// Disables every beam in `group`; returns how many were newly disabled.
    /// The default group is never bulk-disabled.
    pub fn deactivate_detacher_group(&mut self, group: u32) -> usize {
        if group == DEFAULT_DETACHER_GROUP {
            return 0;
        }
        let mut disabled = 0;
        self.for_each_beam_in_detacher_group(group, |_, beam| {
            if !beam.disabled {
                beam.disabled = true;
                disabled += 1;
            }
        });
        disabled
    }

    /// Checks referential integrity and finite initial state.
    pub fn validate(&self) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if !node.position.is_finite() || !node.velocity.is_finite() {
                return Err(SimError::InvalidConfig(format!(
                    "node {index} has a non-finite initial state"
                )));
            }
        }
        for beam in &self.beams {
            self.node(beam.node_a)?;
            self.node(beam.node_b)?;
        }
        Ok(())
    }

    /// Mass-weighted centre of the non-static nodes.
    pub fn center_of_mass(&self) -> Vec3 {
        let (weighted, mass) = self
            .nodes
            .iter()
            .filter(|node| !node.is_static())
            .fold((Vec3::ZERO, 0.0), |(sum, total), node| {
                (sum + node.position * node.mass(), total + node.mass())
            });
        if mass > 0.0 {
            weighted / mass
        } else {
            Vec3::ZERO
        }
    }

    pub fn total_mass(&self) -> f32 {
        self.nodes.iter().map(Node::mass).sum()
    }
}
