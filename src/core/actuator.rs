use serde::{Deserialize, Serialize};

use crate::core::beam::BeamId;
use crate::core::node::NodeId;

/// An input channel shared by command beams and rotators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Command {
    /// +1 while the value rises, -1 while it falls, 0 otherwise.
    pub value_state: i8,
    /// Effective value in `[0, 1]` used by actuators this tick.
    pub value: f32,
    pub trigger_input: f32,
    pub player_input: f32,
    /// Set by command-blocker triggers; player input is ignored while set.
    pub trigger_block: bool,
    pub beams: Vec<BeamId>,
    /// Rotator index with the direction (+1/-1) the command turns it.
    pub rotators: Vec<(usize, f32)>,
    pub description: String,
}

impl Command {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Combines player and trigger input into `value`.
    pub fn update(&mut self) {
        let player = if self.trigger_block { 0.0 } else { self.player_input };
        let next = player.max(self.trigger_input).clamp(0.0, 1.0);
        self.value_state = if next > self.value {
            1
        } else if next < self.value {
            -1
        } else {
            0
        };
        self.value = next;
    }
}

/// Turns four node pairs around an axis toward a target angle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rotator {
    /// Base plate nodes.
    pub nodes1: [NodeId; 4],
    /// Rotating plate nodes.
    pub nodes2: [NodeId; 4],
    pub axis1: NodeId,
    pub axis2: NodeId,
    /// Target angle (rad).
    pub angle: f32,
    /// Target angle change per second at full command.
    pub rate: f32,
    /// Restoring force per radian of error.
    pub force: f32,
    /// Angular error below which no force is applied.
    pub tolerance: f32,
    pub engine_coupling: f32,
    pub needs_engine: bool,
}

impl Rotator {
    pub fn new(nodes1: [NodeId; 4], nodes2: [NodeId; 4], axis1: NodeId, axis2: NodeId) -> Self {
        Self {
            nodes1,
            nodes2,
            axis1,
            axis2,
            angle: 0.0,
            rate: 1.0,
            force: 10_000.0,
            tolerance: 0.0,
            engine_coupling: 1.0,
            needs_engine: false,
        }
    }

    pub fn with_drive(mut self, rate: f32, force: f32, tolerance: f32) -> Self {
        self.rate = rate;
        self.force = force;
        self.tolerance = tolerance;
        self
    }

    pub(crate) fn all_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes1
            .iter()
            .chain(self.nodes2.iter())
            .copied()
            .chain([self.axis1, self.axis2])
    }
}

/// Keeps the angle at `b` between `a` and `c` near its rest value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rigidifier {
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub k: f32,
    pub d: f32,
    /// Rest angle (rad), captured at load time when negative.
    pub alpha: f32,
    pub last_alpha: f32,
    /// Beams whose breakage disables the rigidifier.
    pub beam_a: Option<BeamId>,
    pub beam_c: Option<BeamId>,
}

impl Rigidifier {
    pub fn new(a: NodeId, b: NodeId, c: NodeId, k: f32, d: f32) -> Self {
        Self {
            a,
            b,
            c,
            k,
            d,
            alpha: -1.0,
            last_alpha: -1.0,
            beam_a: None,
            beam_c: None,
        }
    }

    pub fn with_beams(mut self, beam_a: BeamId, beam_c: BeamId) -> Self {
        self.beam_a = Some(beam_a);
        self.beam_c = Some(beam_c);
        self
    }
}
