use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{SimConfig, DEFAULT_DAMP, DEFAULT_SPRING, HOOK_SPEED_DEFAULT, ROPE_RANGE_DEFAULT};
use crate::core::beam::{Beam, BeamId};
use crate::core::node::{NodeId, NodeRef};
use crate::coupling::{attach_beam, CouplingUpdate, LockCycle, LockState, RopableRef};
use crate::utils::math::approach;

const LOCK_TOLERANCE: f32 = 1e-4;

/// A tension-only coupling that always ends on a ropable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rope {
    pub node: NodeId,
    pub beam: BeamId,
    pub group: i32,
    pub lock_range: f32,
    pub lock_speed: f32,
    /// Rest length once locked.
    pub length: f32,
    pub spring: f32,
    pub damp: f32,
    pub cycle: LockCycle,
    pub locked_to: Option<RopableRef>,
}

impl Rope {
    pub fn new(node: NodeId, length: f32) -> Self {
        Self {
            node,
            beam: BeamId(0),
            group: -1,
            lock_range: ROPE_RANGE_DEFAULT,
            lock_speed: HOOK_SPEED_DEFAULT,
            length,
            spring: DEFAULT_SPRING,
            damp: DEFAULT_DAMP,
            cycle: LockCycle::default(),
            locked_to: None,
        }
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn with_range(mut self, lock_range: f32, lock_speed: f32) -> Self {
        self.lock_range = lock_range;
        self.lock_speed = lock_speed;
        self
    }

    pub fn with_spring(mut self, spring: f32, damp: f32) -> Self {
        self.spring = spring;
        self.damp = damp;
        self
    }

    pub fn state(&self) -> LockState {
        self.cycle.state
    }

    pub(crate) fn attach(&mut self, beam: &mut Beam, ropable: RopableRef, remote: NodeRef, distance: f32) {
        attach_beam(beam, remote, distance);
        self.locked_to = Some(ropable);
        self.cycle.begin_prelock();
        debug!("🪢 rope on node {} pre-locking onto {:?}", self.node.0, remote);
    }

    pub(crate) fn begin_unlock(&mut self, ramp_time: f32) -> bool {
        self.cycle.begin_unlock(ramp_time)
    }

    pub(crate) fn release(&mut self, beam: &mut Beam) -> Option<RopableRef> {
        self.cycle.release(beam);
        self.locked_to.take()
    }

    pub(crate) fn advance(&mut self, beam: &mut Beam, config: &SimConfig, dt: f32) -> CouplingUpdate {
        let mut update = CouplingUpdate::default();
        match self.cycle.state {
            LockState::Unlocked | LockState::Locked => {}
            LockState::PreLock => {
                let target = beam.ref_length;
                beam.rest_length = approach(beam.rest_length, target, self.lock_speed * dt);
                if (beam.rest_length - target).abs() <= LOCK_TOLERANCE {
                    self.cycle.lock();
                    update.changed = Some(LockState::Locked);
                    debug!("🪢 rope on node {} locked", self.node.0);
                }
            }
            LockState::PreUnlock => {
                if self.cycle.advance_unlock(beam, config.unlock_ramp_time, dt) {
                    update.released = self.locked_to.take();
                    update.changed = Some(LockState::Unlocked);
                    debug!("🪢 rope on node {} unlocked", self.node.0);
                }
            }
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

    #[test]
    fn prelock_approaches_rope_length_from_either_side() {
        let config = SimConfig::default();
        let vehicle = VehicleId::new(0, 0);
        let ropable = RopableRef { vehicle, index: 0 };
        let remote = NodeRef {
            vehicle,
            node: NodeId(1),
        };

        for start in [0.5_f32, 3.0] {
            let mut rope = Rope::new(NodeId(0), 2.0).with_range(5.0, 10.0);
            let mut beam = coupling_beam(NodeId(0), 100.0, 1.0, Bounded::Rope);
            beam.ref_length = rope.length;
            rope.attach(&mut beam, ropable, remote, start);
            for _ in 0..100 {
                rope.advance(&mut beam, &config, 0.01);
            }
            assert_eq!(rope.state(), LockState::Locked);
            assert!((beam.rest_length - 2.0).abs() < 1e-4);
        }
    }
}
