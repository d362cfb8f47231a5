use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_BEAM_DEFORM, DEFAULT_BEAM_STRENGTH};
use crate::core::node::{NodeId, NodeRef};

/// Index of a beam inside its vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeamId(pub u32);

impl BeamId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for BeamId {
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Beams in this group are never bulk-disabled.
pub const DEFAULT_DETACHER_GROUP: u32 = 0;

/// Rendering/actuation category of a beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BeamKind {
    #[default]
    Normal,
    Hydro,
    /// Solved but never rendered.
    Virtual,
    Marked,
    Invisible,
    InvisibleHydro,
}

impl BeamKind {
    pub fn is_hydro(self) -> bool {
        matches!(self, BeamKind::Hydro | BeamKind::InvisibleHydro)
    }

    pub fn is_visible(self) -> bool {
        !matches!(
            self,
            BeamKind::Virtual | BeamKind::Invisible | BeamKind::InvisibleHydro
        )
    }
}

/// How the spring law is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bounded {
    #[default]
    NoShock,
    /// Stiffens to the bump spring beyond its bounds.
    Shock1,
    /// Separate compression/rebound rates, see [`Shock`](crate::core::shock::Shock).
    Shock2,
    /// Resists compression only.
    SupportBeam,
    /// Resists tension only.
    Rope,
}

/// Binds a beam's rest length to a pair of commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandBinding {
    /// Command whose value shortens the beam.
    pub short_key: usize,
    /// Command whose value extends the beam.
    pub long_key: usize,
    /// Lower bound, as a ratio of the reference length.
    pub short_ratio: f32,
    /// Upper bound, as a ratio of the reference length.
    pub long_ratio: f32,
    /// Ratio change per second at full command value.
    pub rate: f32,
    /// Scale on `rate` while the engine is running.
    pub engine_coupling: f32,
    /// Freeze the beam while the engine is off.
    pub needs_engine: bool,
}

impl CommandBinding {
    pub fn new(short_key: usize, long_key: usize, short_ratio: f32, long_ratio: f32, rate: f32) -> Self {
        Self {
            short_key,
            long_key,
            short_ratio,
            long_ratio,
            rate,
            engine_coupling: 1.0,
            needs_engine: false,
        }
    }
}

crate::flag_set! {
    /// Inputs a hydro beam responds to.
    pub struct HydroFlags: u32 {
        const SPEED = 1 << 0;
        const DIR = 1 << 1;
        const AILERON = 1 << 2;
        const RUDDER = 1 << 3;
        const ELEVATOR = 1 << 4;
        const REV_AILERON = 1 << 5;
        const REV_RUDDER = 1 << 6;
        const REV_ELEVATOR = 1 << 7;
    }
}

/// A spring-damper constraint between two nodes of the same vehicle, or
/// between a local node and a [`NodeRef`] when used by a coupling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beam {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub k: f32,
    pub d: f32,
    /// Current rest length (moved by commands, hydros, couplings, deformation).
    pub rest_length: f32,
    /// Rest length at load time.
    pub ref_length: f32,
    /// Rest length hydros scale from.
    pub hydro_length: f32,
    pub kind: BeamKind,
    pub bounded: Bounded,
    /// Allowed compression beyond which bounded beams react, as a ratio of rest length.
    pub short_bound: f32,
    /// Allowed extension beyond which bounded beams react, as a ratio of rest length.
    pub long_bound: f32,
    pub strength: f32,
    pub deform: f32,
    /// Fraction of the overstress that is kept as elastic stress when deforming.
    pub plastic_coef: f32,
    pub detacher_group: u32,
    /// Index into the vehicle's shock list.
    pub shock: Option<usize>,
    pub hydro_ratio: f32,
    pub hydro_flags: HydroFlags,
    pub command: Option<CommandBinding>,
    pub command_ratio: f32,
    /// Remote endpoint replacing `node_b` while a coupling is attached.
    pub remote: Option<NodeRef>,
    /// Multiplier on the force, ramped by unlocking couplings.
    pub force_scale: f32,

    /// Signed force along the beam from the last evaluation (positive pushes apart).
    pub stress: f32,
    /// Length measured during the last evaluation.
    pub length: f32,
    pub disabled: bool,
    pub broken: bool,
}

impl Beam {
    /// A normal beam. A non-positive `rest_length` is replaced by the node
    /// distance when the beam is added to a store.
    pub fn new(node_a: NodeId, node_b: NodeId, rest_length: f32, k: f32, d: f32) -> Self {
        Self {
            node_a,
            node_b,
            k,
            d,
            rest_length,
            ref_length: rest_length,
            hydro_length: rest_length,
            kind: BeamKind::Normal,
            bounded: Bounded::NoShock,
            short_bound: 0.0,
            long_bound: 0.0,
            strength: DEFAULT_BEAM_STRENGTH,
            deform: DEFAULT_BEAM_DEFORM,
            plastic_coef: 0.0,
            detacher_group: DEFAULT_DETACHER_GROUP,
            shock: None,
            hydro_ratio: 0.0,
            hydro_flags: HydroFlags::EMPTY,
            command: None,
            command_ratio: 1.0,
            remote: None,
            force_scale: 1.0,
            stress: 0.0,
            length: rest_length,
            disabled: false,
            broken: false,
        }
    }

    pub fn with_kind(mut self, kind: BeamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_bounds(mut self, bounded: Bounded, short_bound: f32, long_bound: f32) -> Self {
        self.bounded = bounded;
        self.short_bound = short_bound;
        self.long_bound = long_bound;
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_deform(mut self, deform: f32, plastic_coef: f32) -> Self {
        self.deform = deform;
        self.plastic_coef = plastic_coef;
        self
    }

    pub fn with_detacher_group(mut self, group: u32) -> Self {
        self.detacher_group = group;
        self
    }

    pub fn with_hydro(mut self, ratio: f32, flags: HydroFlags) -> Self {
        if !self.kind.is_hydro() {
            self.kind = BeamKind::Hydro;
        }
        self.hydro_ratio = ratio;
        self.hydro_flags = flags;
        self
    }

    pub fn with_command(mut self, binding: CommandBinding) -> Self {
        self.command = Some(binding);
        self
    }

    /// Starts the beam disabled; used for coupling beams before they attach.
    pub fn detached(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Whether the solver should evaluate this beam at all.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.disabled && !self.broken
    }

    /// Relative elongation from the last evaluation.
    pub fn strain(&self) -> f32 {
        if self.rest_length.abs() < f32::EPSILON {
            0.0
        } else {
            (self.length - self.rest_length) / self.rest_length
        }
    }

    /// Fixes the load-time lengths once the endpoints are known.
    pub(crate) fn settle_lengths(&mut self, distance: f32) {
        if self.rest_length <= 0.0 {
            self.rest_length = distance;
        }
        self.ref_length = self.rest_length;
        self.hydro_length = self.rest_length;
        self.length = distance;
    }
}
