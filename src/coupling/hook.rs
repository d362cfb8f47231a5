use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{
    SimConfig, DEFAULT_DAMP, DEFAULT_SPRING, HOOK_FORCE_DEFAULT, HOOK_RANGE_DEFAULT, HOOK_SPEED_DEFAULT,
};
use crate::core::beam::{Beam, BeamId};
use crate::core::node::{NodeId, NodeRef};
use crate::coupling::{attach_beam, CouplingUpdate, LockCycle, LockState, LockTarget, RopableRef};
use crate::utils::math::approach;

/// Length tolerance for finishing the pull-in.
const LOCK_TOLERANCE: f32 = 1e-4;

/// A hook that pulls itself onto a ropable or a lock-group node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub node: NodeId,
    pub beam: BeamId,
    /// Group addressed by input and hook triggers; `-1` is the default group.
    pub group: i32,
    /// When `lock_nodes` is set, only nodes with this lock group are targets.
    pub lock_group: Option<u32>,
    /// Target plain nodes instead of ropables.
    pub lock_nodes: bool,
    /// Allow targets on the hook's own vehicle.
    pub self_lock: bool,
    pub auto_lock: bool,
    pub lock_range: f32,
    /// Pull-in speed (m/s) while in `PreLock`.
    pub lock_speed: f32,
    /// Stress above which a locked hook lets go.
    pub max_force: f32,
    /// Countdown before an auto-lock attempt.
    pub timer: f32,
    pub timer_preset: f32,
    pub spring: f32,
    pub damp: f32,
    pub cycle: LockCycle,
    pub target: Option<LockTarget>,
}

impl Hook {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            beam: BeamId(0),
            group: -1,
            lock_group: None,
            lock_nodes: false,
            self_lock: false,
            auto_lock: false,
            lock_range: HOOK_RANGE_DEFAULT,
            lock_speed: HOOK_SPEED_DEFAULT,
            max_force: HOOK_FORCE_DEFAULT,
            timer: 0.0,
            timer_preset: 0.0,
            spring: DEFAULT_SPRING,
            damp: DEFAULT_DAMP,
            cycle: LockCycle::default(),
            target: None,
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

    pub fn with_max_force(mut self, max_force: f32) -> Self {
        self.max_force = max_force;
        self
    }

    pub fn with_spring(mut self, spring: f32, damp: f32) -> Self {
        self.spring = spring;
        self.damp = damp;
        self
    }

    /// Lock onto nodes of `lock_group` instead of ropables.
    pub fn locking_nodes(mut self, lock_group: Option<u32>) -> Self {
        self.lock_nodes = true;
        self.lock_group = lock_group;
        self
    }

    pub fn self_locking(mut self) -> Self {
        self.self_lock = true;
        self
    }

    /// Retry locking `timer_preset` seconds after every unlock.
    pub fn auto_locking(mut self, timer_preset: f32) -> Self {
        self.auto_lock = true;
        self.timer_preset = timer_preset;
        self.timer = timer_preset;
        self
    }

    pub fn state(&self) -> LockState {
        self.cycle.state
    }

    /// Whether a node with `lock_group` is an acceptable target.
    pub fn accepts_node(&self, lock_group: Option<u32>) -> bool {
        match (self.lock_group, lock_group) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(wanted), Some(group)) => wanted == group,
        }
    }

    pub(crate) fn attach(&mut self, beam: &mut Beam, target: LockTarget, remote: NodeRef, distance: f32) {
        attach_beam(beam, remote, distance);
        self.target = Some(target);
        self.cycle.begin_prelock();
        debug!("🪝 hook on node {} pre-locking onto {:?}", self.node.0, remote);
    }

    pub(crate) fn begin_unlock(&mut self, ramp_time: f32) -> bool {
        self.cycle.begin_unlock(ramp_time)
    }

    /// Drops the hook immediately; returns the ropable it held.
    pub(crate) fn release(&mut self, beam: &mut Beam) -> Option<RopableRef> {
        self.cycle.release(beam);
        self.timer = self.timer_preset;
        self.target.take().and_then(|t| t.ropable())
    }

    pub(crate) fn advance(&mut self, beam: &mut Beam, config: &SimConfig, dt: f32) -> CouplingUpdate {
        let mut update = CouplingUpdate::default();
        match self.cycle.state {
            LockState::Unlocked => {
                if self.auto_lock {
                    self.timer -= dt;
                    if self.timer <= 0.0 {
                        self.timer = self.timer_preset;
                        update.wants_lock = true;
                    }
                }
            }
            LockState::PreLock => {
                let target = config.hook_locked_length;
                beam.rest_length = approach(beam.rest_length, target, self.lock_speed * dt);
                if beam.rest_length <= target + LOCK_TOLERANCE {
                    self.cycle.lock();
                    update.changed = Some(LockState::Locked);
                    debug!("🪝 hook on node {} locked", self.node.0);
                }
            }
            LockState::Locked => {
                if beam.stress.abs() > self.max_force && self.cycle.begin_unlock(config.unlock_ramp_time) {
                    update.changed = Some(LockState::PreUnlock);
                    debug!(
                        "🪝 hook on node {} overloaded ({:.0} N), unlocking",
                        self.node.0,
                        beam.stress.abs()
                    );
                }
            }
            LockState::PreUnlock => {
                if self.cycle.advance_unlock(beam, config.unlock_ramp_time, dt) {
                    self.timer = self.timer_preset;
                    update.released = self.target.take().and_then(|t| t.ropable());
                    update.changed = Some(LockState::Unlocked);
                    debug!("🪝 hook on node {} unlocked", self.node.0);
                }
            }
        }
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::coupling_beam;
    use crate::core::beam::Bounded;
    use crate::utils::allocator::VehicleId;

    fn remote() -> (LockTarget, NodeRef) {
        let vehicle = VehicleId::new(1, 0);
        (
            LockTarget::Ropable(RopableRef { vehicle, index: 0 }),
            NodeRef {
                vehicle,
                node: NodeId(0),
            },
        )
    }

    #[test]
    fn prelock_pulls_in_then_locks() {
        let config = SimConfig::default();
        let mut hook = Hook::new(NodeId(0)).with_range(1.0, 1.0);
        let mut beam = coupling_beam(NodeId(0), 100.0, 1.0, Bounded::NoShock);
        let (target, node) = remote();
        hook.attach(&mut beam, target, node, 0.3);
        assert_eq!(hook.state(), LockState::PreLock);

        let mut ticks = 0;
        while hook.state() == LockState::PreLock && ticks < 1000 {
            hook.advance(&mut beam, &config, 0.01);
            ticks += 1;
        }
        assert_eq!(hook.state(), LockState::Locked);
        assert!((beam.rest_length - config.hook_locked_length).abs() < 1e-4);
    }

    #[test]
    fn overload_unlocks_and_releases_ropable() {
        let config = SimConfig::default();
        let mut hook = Hook::new(NodeId(0)).with_max_force(10.0).auto_locking(0.5);
        let mut beam = coupling_beam(NodeId(0), 100.0, 1.0, Bounded::NoShock);
        let (target, node) = remote();
        hook.attach(&mut beam, target, node, config.hook_locked_length);
        hook.advance(&mut beam, &config, 0.01);
        assert_eq!(hook.state(), LockState::Locked);

        beam.stress = 50.0;
        let update = hook.advance(&mut beam, &config, 0.01);
        assert_eq!(update.changed, Some(LockState::PreUnlock));

        let mut released = None;
        for _ in 0..100 {
            let update = hook.advance(&mut beam, &config, 0.01);
            if update.released.is_some() {
                released = update.released;
                break;
            }
        }
        assert_eq!(released, target.ropable());
        assert_eq!(hook.state(), LockState::Unlocked);
        assert_eq!(hook.timer, 0.5);
        assert!(beam.disabled);
    }

    #[test]
    fn auto_lock_fires_when_timer_expires() {
        let config = SimConfig::default();
        let mut hook = Hook::new(NodeId(0)).auto_locking(0.05);
        let mut beam = coupling_beam(NodeId(0), 100.0, 1.0, Bounded::NoShock);
        let fired: Vec<bool> = (0..6)
            .map(|_| hook.advance(&mut beam, &config, 0.01).wants_lock)
            .collect();
        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
    }
}
