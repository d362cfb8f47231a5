//! Dynamic couplings between vehicles: hooks, ropes and ties.
//!
//! Each coupling owns a pre-allocated beam on its vehicle that stays disabled
//! while unlocked. Locking points the beam's far end at a [`NodeRef`] on any
//! vehicle; the world evaluates those beams after all vehicles have finished
//! their own forces, so both endpoints are read at the same tick.

pub mod hook;
pub mod resolve;
pub mod rope;
pub mod ropable;
pub mod tie;

use serde::{Deserialize, Serialize};

use crate::core::beam::{Beam, BeamKind, Bounded};
use crate::core::node::{NodeId, NodeRef};
use crate::utils::allocator::VehicleId;

pub use hook::Hook;
pub use resolve::{LockPlan, LockRequestOutcome};
pub use rope::Rope;
pub use ropable::Ropable;
pub use tie::Tie;

/// Lock cycle shared by hooks and ropes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LockState {
    #[default]
    Unlocked,
    /// Pulling in toward the target.
    PreLock,
    Locked,
    /// Ramping the coupling force down before release.
    PreUnlock,
}

/// The state machine driving a hook or rope, independent of what it targets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LockCycle {
    pub state: LockState,
    /// Seconds left in the unlock ramp.
    pub unlock_ramp: f32,
}

impl LockCycle {
    pub fn is_engaged(&self) -> bool {
        self.state != LockState::Unlocked
    }

    pub(crate) fn begin_prelock(&mut self) {
        self.state = LockState::PreLock;
    }

    pub(crate) fn lock(&mut self) {
        self.state = LockState::Locked;
    }

    /// Starts ramping the force down. Returns `false` when already unlocking
    /// or unlocked.
    pub(crate) fn begin_unlock(&mut self, ramp_time: f32) -> bool {
        match self.state {
            LockState::PreLock | LockState::Locked => {
                self.state = LockState::PreUnlock;
                self.unlock_ramp = ramp_time;
                true
            }
            LockState::PreUnlock | LockState::Unlocked => false,
        }
    }

    /// Advances the unlock ramp, scaling `beam`'s force. Returns `true` once
    /// the ramp has finished and the cycle is back to `Unlocked`.
    pub(crate) fn advance_unlock(&mut self, beam: &mut Beam, ramp_time: f32, dt: f32) -> bool {
        if self.state != LockState::PreUnlock {
            return false;
        }
        self.unlock_ramp -= dt;
        if self.unlock_ramp <= 0.0 {
            self.state = LockState::Unlocked;
            self.unlock_ramp = 0.0;
            detach_beam(beam);
            return true;
        }
        beam.force_scale = (self.unlock_ramp / ramp_time).clamp(0.0, 1.0);
        false
    }

    /// Drops straight to `Unlocked`, skipping the ramp.
    pub(crate) fn release(&mut self, beam: &mut Beam) {
        self.state = LockState::Unlocked;
        self.unlock_ramp = 0.0;
        detach_beam(beam);
    }
}

pub(crate) fn attach_beam(beam: &mut Beam, remote: NodeRef, rest_length: f32) {
    beam.remote = Some(remote);
    beam.rest_length = rest_length;
    beam.force_scale = 1.0;
    beam.stress = 0.0;
    beam.length = rest_length;
    beam.disabled = false;
}

pub(crate) fn detach_beam(beam: &mut Beam) {
    beam.remote = None;
    beam.disabled = true;
    beam.stress = 0.0;
    beam.force_scale = 1.0;
}

/// What changed in a coupling during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CouplingUpdate {
    /// New state, when it changed.
    pub changed: Option<LockState>,
    /// Ropable the coupling let go of.
    pub released: Option<RopableRef>,
    /// The coupling asks to be locked again.
    pub wants_lock: bool,
}

/// A spring-damper beam for a coupling, disabled until something attaches.
pub(crate) fn coupling_beam(node: NodeId, spring: f32, damp: f32, bounded: Bounded) -> Beam {
    let mut beam = Beam::new(node, node, 0.0, spring, damp)
        .with_kind(BeamKind::Invisible)
        .with_bounds(bounded, 0.0, 0.0)
        .with_strength(f32::MAX)
        .with_deform(f32::MAX, 0.0)
        .detached();
    beam.rest_length = MIN_COUPLING_LENGTH;
    beam
}

/// Rest length of an idle coupling beam.
const MIN_COUPLING_LENGTH: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CouplingKind {
    Hook,
    Rope,
    Tie,
}

/// What a request wants to happen to the addressed couplings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouplingIntent {
    Lock,
    Unlock,
    Toggle,
}

/// Input or trigger request against one group of couplings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingRequest {
    pub kind: CouplingKind,
    /// `None` addresses every coupling of that kind.
    pub group: Option<i32>,
    pub intent: CouplingIntent,
}

impl CouplingRequest {
    pub fn new(kind: CouplingKind, group: Option<i32>, intent: CouplingIntent) -> Self {
        Self { kind, group, intent }
    }

    pub(crate) fn addresses(&self, group: i32) -> bool {
        self.group.map_or(true, |g| g == group)
    }
}

/// Ropable on a given vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RopableRef {
    pub vehicle: VehicleId,
    pub index: usize,
}

/// What a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockTarget {
    Ropable(RopableRef),
    Node(NodeRef),
}

impl LockTarget {
    pub fn vehicle(&self) -> VehicleId {
        match self {
            LockTarget::Ropable(r) => r.vehicle,
            LockTarget::Node(n) => n.vehicle,
        }
    }

    pub fn ropable(&self) -> Option<RopableRef> {
        match self {
            LockTarget::Ropable(r) => Some(*r),
            LockTarget::Node(_) => None,
        }
    }
}

/// Groups of `-1` match any other group.
pub(crate) fn groups_match(a: i32, b: i32) -> bool {
    a == -1 || b == -1 || a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::NodeId;

    #[test]
    fn unlock_ramp_scales_force_then_detaches() {
        let mut beam = Beam::new(NodeId(0), NodeId(0), 1.0, 1.0, 0.0).detached();
        let remote = NodeRef {
            vehicle: VehicleId::new(0, 0),
            node: NodeId(1),
        };
        attach_beam(&mut beam, remote, 1.0);
        let mut cycle = LockCycle::default();
        cycle.begin_prelock();
        cycle.lock();
        assert!(cycle.begin_unlock(1.0));
        assert!(!cycle.begin_unlock(1.0));

        assert!(!cycle.advance_unlock(&mut beam, 1.0, 0.25));
        assert!((beam.force_scale - 0.75).abs() < 1e-6);
        assert!(!cycle.advance_unlock(&mut beam, 1.0, 0.5));
        assert!(cycle.advance_unlock(&mut beam, 1.0, 0.5));
        assert_eq!(cycle.state, LockState::Unlocked);
        assert!(beam.disabled && beam.remote.is_none());
    }

    #[test]
    fn wildcard_groups_match_anything() {
        assert!(groups_match(-1, 4));
        assert!(groups_match(4, -1));
        assert!(groups_match(2, 2));
        assert!(!groups_match(2, 3));
    }
}
