use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{SimConfig, DEFAULT_DAMP, DEFAULT_SPRING, TIE_MAX_STRESS_DEFAULT, TIE_RANGE_DEFAULT};
use crate::core::beam::{Beam, BeamId};
use crate::core::node::{NodeId, NodeRef};
use crate::coupling::{attach_beam, detach_beam, CouplingUpdate, LockState, RopableRef};

/// A strap that winches itself tight onto a ropable while commanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tie {
    pub node: NodeId,
    pub beam: BeamId,
    pub group: i32,
    pub lock_range: f32,
    /// Stress at which a tying strap counts as tight.
    pub max_stress: f32,
    pub spring: f32,
    pub damp: f32,
    pub tying: bool,
    pub tied: bool,
    pub locked_to: Option<RopableRef>,
}

impl Tie {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            beam: BeamId(0),
            group: -1,
            lock_range: TIE_RANGE_DEFAULT,
            max_stress: TIE_MAX_STRESS_DEFAULT,
            spring: DEFAULT_SPRING,
            damp: DEFAULT_DAMP,
            tying: false,
            tied: false,
            locked_to: None,
        }
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn with_range(mut self, lock_range: f32) -> Self {
        self.lock_range = lock_range;
        self
    }

    pub fn with_max_stress(mut self, max_stress: f32) -> Self {
        self.max_stress = max_stress;
        self
    }

    pub fn with_spring(mut self, spring: f32, damp: f32) -> Self {
        self.spring = spring;
        self.damp = damp;
        self
    }

    pub fn is_engaged(&self) -> bool {
        self.tying || self.tied
    }

    /// The tie's flags mapped onto the shared lock states.
    pub fn lock_state(&self) -> LockState {
        if self.tied {
            LockState::Locked
        } else if self.tying {
            LockState::PreLock
        } else {
            LockState::Unlocked
        }
    }

    pub(crate) fn begin(&mut self, beam: &mut Beam, ropable: RopableRef, remote: NodeRef, distance: f32) {
        attach_beam(beam, remote, distance);
        self.locked_to = Some(ropable);
        self.tying = true;
        self.tied = false;
        debug!("🔗 tie on node {} tying onto {:?}", self.node.0, remote);
    }

    /// Clears both flags and drops the strap; returns the ropable it held.
    pub(crate) fn release(&mut self, beam: &mut Beam) -> Option<RopableRef> {
        detach_beam(beam);
        self.tying = false;
        self.tied = false;
        debug!("🔗 tie on node {} released", self.node.0);
        self.locked_to.take()
    }

    /// Shortens a tying strap by `tie_speed * command_value` per second.
    pub(crate) fn advance(
        &mut self,
        beam: &mut Beam,
        command_value: f32,
        config: &SimConfig,
        dt: f32,
    ) -> CouplingUpdate {
        let mut update = CouplingUpdate::default();
        if !self.tying || self.tied || command_value <= 0.0 {
            return update;
        }
        let shortened = beam.rest_length - config.tie_speed * command_value * dt;
        beam.rest_length = shortened.max(config.tie_min_length);
        if beam.rest_length <= config.tie_min_length || beam.stress.abs() >= self.max_stress {
            self.tied = true;
            self.tying = false;
            update.changed = Some(LockState::Locked);
            debug!(
                "🔗 tie on node {} tied at {:.3} m ({:.0} N)",
                self.node.0,
                beam.rest_length,
                beam.stress.abs()
            );
        }
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::beam::Bounded;
    use crate::coupling::coupling_beam;
    use crate::utils::allocator::VehicleId;

    fn tying() -> (Tie, Beam) {
        let vehicle = VehicleId::new(0, 0);
        let mut tie = Tie::new(NodeId(0)).with_max_stress(500.0);
        let mut beam = coupling_beam(NodeId(0), 100.0, 1.0, Bounded::Rope);
        tie.begin(
            &mut beam,
            RopableRef { vehicle, index: 0 },
            NodeRef {
                vehicle,
                node: NodeId(1),
            },
            1.0,
        );
        (tie, beam)
    }

    #[test]
    fn zero_command_never_ties() {
        let config = SimConfig::default();
        let (mut tie, mut beam) = tying();
        for _ in 0..10_000 {
            tie.advance(&mut beam, 0.0, &config, 0.01);
            assert!(!tie.tied);
        }
        assert_eq!(beam.rest_length, 1.0);
    }

    #[test]
    fn commanded_tie_winches_to_min_length() {
        let config = SimConfig::default();
        let (mut tie, mut beam) = tying();
        let mut ticks = 0;
        while !tie.tied && ticks < 10_000 {
            tie.advance(&mut beam, 1.0, &config, 0.01);
            ticks += 1;
        }
        assert!(tie.tied && !tie.tying);
        assert_eq!(beam.rest_length, config.tie_min_length);
        assert_eq!(tie.lock_state(), LockState::Locked);
    }

    #[test]
    fn stress_threshold_ends_tying_early() {
        let config = SimConfig::default();
        let (mut tie, mut beam) = tying();
        beam.stress = -600.0;
        let update = tie.advance(&mut beam, 0.5, &config, 0.01);
        assert_eq!(update.changed, Some(LockState::Locked));
        assert!(beam.rest_length > 0.9);
    }

    #[test]
    fn release_clears_flags_and_returns_ropable() {
        let (mut tie, mut beam) = tying();
        assert!(tie.release(&mut beam).is_some());
        assert!(!tie.is_engaged());
        assert!(beam.disabled && beam.remote.is_none());
    }
}
