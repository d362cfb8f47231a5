//! Turning coupling requests into attachments.
//!
//! Resolution runs in two passes over the vehicle arena. Planning reads every
//! vehicle immutably and picks the nearest eligible target for each addressed
//! coupling. Applying then claims ropables one plan at a time, so two
//! couplings racing for the same single-lock ropable resolve in plan order and
//! the loser simply stays unlocked.

use glam::Vec3;
use log::debug;

use crate::config::SimConfig;
use crate::core::node::{NodeId, NodeRef};
use crate::coupling::{
    groups_match, CouplingIntent, CouplingKind, LockState, LockTarget, RopableRef,
};
use crate::error::{Result, SimError};
use crate::events::SimEvent;
use crate::utils::allocator::{Arena, VehicleId};
use crate::vehicle::Vehicle;

/// One resolved action for a coupling of the owning vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockPlan {
    Hook {
        hook: usize,
        target: LockTarget,
        remote: NodeRef,
        distance: f32,
    },
    Rope {
        rope: usize,
        ropable: RopableRef,
        remote: NodeRef,
        distance: f32,
    },
    Tie {
        tie: usize,
        ropable: RopableRef,
        remote: NodeRef,
        distance: f32,
    },
    UnlockHook(usize),
    UnlockRope(usize),
    ReleaseTie(usize),
}

/// What applying a plan did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockRequestOutcome {
    Attached,
    /// The target was taken first, or the coupling was no longer free.
    Contested,
    Released,
    /// Nothing to do: the coupling was already in the requested state.
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    ropable: RopableRef,
    remote: NodeRef,
    distance: f32,
    available: bool,
}

/// Nearest ropable within `range` of `from`. Ties in distance go to the
/// lowest vehicle slot and ropable index.
fn nearest_ropable(
    vehicles: &Arena<Vehicle>,
    owner: VehicleId,
    from: (Vec3, NodeId),
    range: f32,
    group: i32,
    allow_own: bool,
    require_available: bool,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for (id, vehicle) in vehicles.iter_with_ids() {
        if !vehicle.state.accepts_couplings() || (id == owner && !allow_own) {
            continue;
        }
        for (index, ropable) in vehicle.ropables.iter().enumerate() {
            if id == owner && ropable.node == from.1 {
                continue;
            }
            if !groups_match(group, ropable.group) {
                continue;
            }
            let available = ropable.is_available();
            if require_available && !available {
                continue;
            }
            let distance = vehicle.node_position(ropable.node).distance(from.0);
            if distance > range || best.is_some_and(|b| distance >= b.distance) {
                continue;
            }
            best = Some(Candidate {
                ropable: RopableRef { vehicle: id, index },
                remote: NodeRef {
                    vehicle: id,
                    node: ropable.node,
                },
                distance,
                available,
            });
        }
    }
    best
}

/// Nearest node of an acceptable lock group within the hook's range.
fn nearest_lock_node(vehicles: &Arena<Vehicle>, owner: VehicleId, hook: usize) -> Option<(NodeRef, f32)> {
    let vehicle = vehicles.get(owner)?;
    let hook = &vehicle.hooks[hook];
    let from = vehicle.node_position(hook.node);
    let mut best: Option<(NodeRef, f32)> = None;
    for (id, other) in vehicles.iter_with_ids() {
        if !other.state.accepts_couplings() || (id == owner && !hook.self_lock) {
            continue;
        }
        for (index, node) in other.store.nodes().iter().enumerate() {
            let node_id = NodeId::from(index);
            if (id == owner && node_id == hook.node) || !hook.accepts_node(node.lock_group) {
                continue;
            }
            let distance = node.position.distance(from);
            if distance > hook.lock_range || best.is_some_and(|(_, d)| distance >= d) {
                continue;
            }
            best = Some((
                NodeRef {
                    vehicle: id,
                    node: node_id,
                },
                distance,
            ));
        }
    }
    best
}

fn plan_hook_lock(vehicles: &Arena<Vehicle>, owner: VehicleId, vehicle: &Vehicle, index: usize) -> Option<LockPlan> {
    let hook = &vehicle.hooks[index];
    if hook.state() != LockState::Unlocked {
        return None;
    }
    if hook.lock_nodes {
        let (remote, distance) = nearest_lock_node(vehicles, owner, index)?;
        return Some(LockPlan::Hook {
            hook: index,
            target: LockTarget::Node(remote),
            remote,
            distance,
        });
    }
    let from = (vehicle.node_position(hook.node), hook.node);
    let candidate = nearest_ropable(vehicles, owner, from, hook.lock_range, hook.group, hook.self_lock, true)?;
    Some(LockPlan::Hook {
        hook: index,
        target: LockTarget::Ropable(candidate.ropable),
        remote: candidate.remote,
        distance: candidate.distance,
    })
}

fn plan_rope_lock(vehicles: &Arena<Vehicle>, owner: VehicleId, vehicle: &Vehicle, index: usize) -> Option<LockPlan> {
    let rope = &vehicle.ropes[index];
    if rope.state() != LockState::Unlocked {
        return None;
    }
    let from = (vehicle.node_position(rope.node), rope.node);
    let candidate = nearest_ropable(vehicles, owner, from, rope.lock_range, rope.group, true, true)?;
    Some(LockPlan::Rope {
        rope: index,
        ropable: candidate.ropable,
        remote: candidate.remote,
        distance: candidate.distance,
    })
}

fn plan_tie(vehicles: &Arena<Vehicle>, owner: VehicleId, vehicle: &Vehicle, index: usize) -> Option<LockPlan> {
    let tie = &vehicle.ties[index];
    if tie.is_engaged() {
        return None;
    }
    let from = (vehicle.node_position(tie.node), tie.node);
    let candidate = nearest_ropable(vehicles, owner, from, tie.lock_range, tie.group, true, true)?;
    Some(LockPlan::Tie {
        tie: index,
        ropable: candidate.ropable,
        remote: candidate.remote,
        distance: candidate.distance,
    })
}

/// Plans the pending requests and auto-locks of `owner`.
///
/// Each coupling is planned at most once per call even when several
/// requests address it.
pub fn plan_requests(vehicles: &Arena<Vehicle>, owner: VehicleId) -> Vec<LockPlan> {
    let Some(vehicle) = vehicles.get(owner) else {
        return Vec::new();
    };
    let mut plans = Vec::new();
    let mut hook_seen = vec![false; vehicle.hooks.len()];
    let mut rope_seen = vec![false; vehicle.ropes.len()];
    let mut tie_seen = vec![false; vehicle.ties.len()];

    for &index in &vehicle.auto_lock {
        if index < hook_seen.len() && !hook_seen[index] {
            hook_seen[index] = true;
            plans.extend(plan_hook_lock(vehicles, owner, vehicle, index));
        }
    }

    for request in &vehicle.requests {
        match request.kind {
            CouplingKind::Hook => {
                for (index, hook) in vehicle.hooks.iter().enumerate() {
                    if hook_seen[index] || !request.addresses(hook.group) {
                        continue;
                    }
                    hook_seen[index] = true;
                    let engaged = hook.cycle.is_engaged();
                    match (request.intent, engaged) {
                        (CouplingIntent::Lock | CouplingIntent::Toggle, false) => {
                            plans.extend(plan_hook_lock(vehicles, owner, vehicle, index));
                        }
                        (CouplingIntent::Unlock | CouplingIntent::Toggle, true) => {
                            plans.push(LockPlan::UnlockHook(index));
                        }
                        _ => {}
                    }
                }
            }
            CouplingKind::Rope => {
                for (index, rope) in vehicle.ropes.iter().enumerate() {
                    if rope_seen[index] || !request.addresses(rope.group) {
                        continue;
                    }
                    rope_seen[index] = true;
                    match (request.intent, rope.cycle.is_engaged()) {
                        (CouplingIntent::Lock | CouplingIntent::Toggle, false) => {
                            plans.extend(plan_rope_lock(vehicles, owner, vehicle, index));
                        }
                        (CouplingIntent::Unlock | CouplingIntent::Toggle, true) => {
                            plans.push(LockPlan::UnlockRope(index));
                        }
                        _ => {}
                    }
                }
            }
            CouplingKind::Tie => {
                let addressed: Vec<usize> = (0..vehicle.ties.len())
                    .filter(|&i| !tie_seen[i] && request.addresses(vehicle.ties[i].group))
                    .collect();
                // A toggle acts on the group as a whole.
                let release = match request.intent {
                    CouplingIntent::Lock => false,
                    CouplingIntent::Unlock => true,
                    CouplingIntent::Toggle => addressed.iter().any(|&i| vehicle.ties[i].is_engaged()),
                };
                for index in addressed {
                    tie_seen[index] = true;
                    if release {
                        if vehicle.ties[index].is_engaged() {
                            plans.push(LockPlan::ReleaseTie(index));
                        }
                    } else {
                        plans.extend(plan_tie(vehicles, owner, vehicle, index));
                    }
                }
            }
        }
    }
    plans
}

fn acquire(vehicles: &mut Arena<Vehicle>, ropable: RopableRef) -> bool {
    vehicles
        .get_mut(ropable.vehicle)
        .and_then(|v| v.ropables.get_mut(ropable.index))
        .is_some_and(|r| r.try_acquire())
}

pub(crate) fn release_ropable(vehicles: &mut Arena<Vehicle>, ropable: RopableRef) {
    if let Some(vehicle) = vehicles.get_mut(ropable.vehicle) {
        vehicle.release_ropable(ropable.index);
    }
}

fn changed(vehicle: &mut Vehicle, kind: CouplingKind, index: usize, state: LockState) {
    let event = SimEvent::CouplingChanged {
        vehicle: vehicle.id(),
        kind,
        index,
        state,
    };
    vehicle.emit(event);
}

/// Applies one plan. Losing a ropable race is a silent no-op.
pub fn apply_plan(
    vehicles: &mut Arena<Vehicle>,
    owner: VehicleId,
    plan: LockPlan,
    config: &SimConfig,
) -> LockRequestOutcome {
    let claimed = match plan {
        LockPlan::Hook {
            target: LockTarget::Ropable(ropable),
            ..
        }
        | LockPlan::Rope { ropable, .. }
        | LockPlan::Tie { ropable, .. } => Some(ropable),
        _ => None,
    };
    if let Some(ropable) = claimed {
        if !acquire(vehicles, ropable) {
            debug!("{owner} lost ropable {ropable:?} to another coupling");
            return LockRequestOutcome::Contested;
        }
    }

    if !vehicles.contains(owner) {
        if let Some(ropable) = claimed {
            release_ropable(vehicles, ropable);
        }
        return LockRequestOutcome::Contested;
    }
    let Some(vehicle) = vehicles.get_mut(owner) else {
        return LockRequestOutcome::Contested;
    };

    let mut freed = None;
    let outcome = match plan {
        LockPlan::Hook {
            hook,
            target,
            remote,
            distance,
        } => {
            if vehicle.hooks[hook].state() == LockState::Unlocked {
                let beam = &mut vehicle.store.beams_mut()[vehicle.hooks[hook].beam.index()];
                vehicle.hooks[hook].attach(beam, target, remote, distance);
                changed(vehicle, CouplingKind::Hook, hook, LockState::PreLock);
                LockRequestOutcome::Attached
            } else {
                freed = claimed;
                LockRequestOutcome::Contested
            }
        }
        LockPlan::Rope {
            rope,
            ropable,
            remote,
            distance,
        } => {
            if vehicle.ropes[rope].state() == LockState::Unlocked {
                let beam = &mut vehicle.store.beams_mut()[vehicle.ropes[rope].beam.index()];
                vehicle.ropes[rope].attach(beam, ropable, remote, distance);
                changed(vehicle, CouplingKind::Rope, rope, LockState::PreLock);
                LockRequestOutcome::Attached
            } else {
                freed = claimed;
                LockRequestOutcome::Contested
            }
        }
        LockPlan::Tie {
            tie,
            ropable,
            remote,
            distance,
        } => {
            if !vehicle.ties[tie].is_engaged() {
                let beam = &mut vehicle.store.beams_mut()[vehicle.ties[tie].beam.index()];
                vehicle.ties[tie].begin(beam, ropable, remote, distance);
                changed(vehicle, CouplingKind::Tie, tie, LockState::PreLock);
                LockRequestOutcome::Attached
            } else {
                freed = claimed;
                LockRequestOutcome::Contested
            }
        }
        LockPlan::UnlockHook(hook) => {
            if vehicle.hooks[hook].begin_unlock(config.unlock_ramp_time) {
                debug!("🪝 {owner} hook {hook} unlocking on request");
                changed(vehicle, CouplingKind::Hook, hook, LockState::PreUnlock);
                LockRequestOutcome::Released
            } else {
                LockRequestOutcome::Unchanged
            }
        }
        LockPlan::UnlockRope(rope) => {
            if vehicle.ropes[rope].begin_unlock(config.unlock_ramp_time) {
                debug!("🪢 {owner} rope {rope} unlocking on request");
                changed(vehicle, CouplingKind::Rope, rope, LockState::PreUnlock);
                LockRequestOutcome::Released
            } else {
                LockRequestOutcome::Unchanged
            }
        }
        LockPlan::ReleaseTie(tie) => {
            if vehicle.ties[tie].is_engaged() {
                let beam = &mut vehicle.store.beams_mut()[vehicle.ties[tie].beam.index()];
                freed = vehicle.ties[tie].release(beam);
                changed(vehicle, CouplingKind::Tie, tie, LockState::Unlocked);
                LockRequestOutcome::Released
            } else {
                LockRequestOutcome::Unchanged
            }
        }
    };
    if let Some(ropable) = freed {
        release_ropable(vehicles, ropable);
    }
    outcome
}

/// Plans and applies all pending requests of every vehicle, in slot order.
pub(crate) fn resolve_requests(vehicles: &mut Arena<Vehicle>, config: &SimConfig) -> usize {
    let mut applied = 0;
    for owner in vehicles.ids() {
        let has_work = vehicles
            .get(owner)
            .is_some_and(|v| !v.requests.is_empty() || !v.auto_lock.is_empty());
        if !has_work {
            continue;
        }
        let plans = plan_requests(vehicles, owner);
        if let Some(vehicle) = vehicles.get_mut(owner) {
            vehicle.requests.clear();
            vehicle.auto_lock.clear();
        }
        for plan in plans {
            if apply_plan(vehicles, owner, plan, config) != LockRequestOutcome::Contested {
                applied += 1;
            }
        }
    }
    applied
}

/// Locks rope `rope` of `owner` onto the nearest ropable in range.
///
/// Returns `Ok(false)` when nothing is in range, and `InvalidTransition`
/// when the rope is not unlocked or the nearest ropable is already taken.
/// Neither error changes any state.
pub fn try_lock_rope(
    vehicles: &mut Arena<Vehicle>,
    owner: VehicleId,
    rope: usize,
    config: &SimConfig,
) -> Result<bool> {
    let vehicle = vehicles.get(owner).ok_or(SimError::UnknownVehicle(owner))?;
    let entry = vehicle
        .ropes
        .get(rope)
        .ok_or_else(|| SimError::out_of_range("rope", rope, vehicle.ropes.len()))?;
    if entry.state() != LockState::Unlocked {
        return Err(SimError::InvalidTransition(format!(
            "rope {rope} of {owner} is {:?}, not Unlocked",
            entry.state()
        )));
    }
    let from = (vehicle.node_position(entry.node), entry.node);
    let Some(candidate) = nearest_ropable(vehicles, owner, from, entry.lock_range, entry.group, true, false) else {
        return Ok(false);
    };
    if !candidate.available {
        return Err(SimError::InvalidTransition(format!(
            "ropable {} on {} is in use",
            candidate.ropable.index, candidate.ropable.vehicle
        )));
    }
    let plan = LockPlan::Rope {
        rope,
        ropable: candidate.ropable,
        remote: candidate.remote,
        distance: candidate.distance,
    };
    Ok(apply_plan(vehicles, owner, plan, config) == LockRequestOutcome::Attached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::Node;
    use crate::coupling::{Hook, Ropable, Rope, Tie};

    fn truck(x: f32) -> Vehicle {
        let mut vehicle = Vehicle::new("truck");
        vehicle.add_node(Node::new(Vec3::new(x, 0.0, 0.0), 100.0));
        vehicle.add_node(Node::new(Vec3::new(x + 1.0, 0.0, 0.0), 100.0));
        vehicle
    }

    fn spawn(arena: &mut Arena<Vehicle>, mut vehicle: Vehicle) -> VehicleId {
        let id = arena.next_id();
        vehicle.id = id;
        arena.insert(vehicle)
    }

    #[test]
    fn hook_out_of_range_stays_unlocked() {
        let mut arena = Arena::new();
        let mut tow = truck(0.0);
        tow.add_hook(Hook::new(NodeId(1)).with_range(0.4, 1.0)).unwrap();
        let mut towed = truck(3.0);
        towed.add_ropable(Ropable::new(NodeId(0))).unwrap();
        let tow = spawn(&mut arena, tow);
        spawn(&mut arena, towed);

        arena.get_mut(tow).unwrap().request_hooks(None, CouplingIntent::Lock);
        assert!(plan_requests(&arena, tow).is_empty());
        resolve_requests(&mut arena, &SimConfig::default());
        assert_eq!(arena.get(tow).unwrap().hooks()[0].state(), LockState::Unlocked);
    }

    #[test]
    fn hook_skips_own_ropables_unless_self_locking() {
        let mut arena = Arena::new();
        let mut vehicle = truck(0.0);
        vehicle.add_hook(Hook::new(NodeId(0))).unwrap();
        vehicle.add_ropable(Ropable::new(NodeId(1))).unwrap();
        vehicle.hooks[0].lock_range = 2.0;
        let id = spawn(&mut arena, vehicle);

        arena.get_mut(id).unwrap().request_hooks(None, CouplingIntent::Lock);
        assert!(plan_requests(&arena, id).is_empty());

        arena.get_mut(id).unwrap().hooks[0].self_lock = true;
        assert_eq!(plan_requests(&arena, id).len(), 1);
    }

    #[test]
    fn two_ropes_racing_for_one_ropable() {
        let mut arena = Arena::new();
        let mut first = truck(0.0);
        first.add_rope(Rope::new(NodeId(1), 1.0)).unwrap();
        let mut second = truck(3.0);
        second.add_rope(Rope::new(NodeId(0), 1.0)).unwrap();
        let mut post = truck(10.0);
        post.state = crate::vehicle::SimState::Networked;
        post.add_node(Node::fixed(Vec3::new(2.0, 0.0, 0.0)));
        post.add_ropable(Ropable::new(NodeId(2))).unwrap();

        let first = spawn(&mut arena, first);
        let second = spawn(&mut arena, second);
        let post = spawn(&mut arena, post);
        arena.get_mut(first).unwrap().request_ropes(None, CouplingIntent::Lock);
        arena.get_mut(second).unwrap().request_ropes(None, CouplingIntent::Lock);
        resolve_requests(&mut arena, &SimConfig::default());

        assert_eq!(arena.get(first).unwrap().ropes()[0].state(), LockState::PreLock);
        assert_eq!(arena.get(second).unwrap().ropes()[0].state(), LockState::Unlocked);
        assert_eq!(arena.get(post).unwrap().ropables()[0].lock_count(), 1);
    }

    #[test]
    fn try_lock_rope_reports_busy_ropable() {
        let mut arena = Arena::new();
        let mut roper = truck(0.0);
        roper.add_rope(Rope::new(NodeId(1), 1.0)).unwrap();
        let mut anchor = truck(1.5);
        anchor.add_ropable(Ropable::new(NodeId(0))).unwrap();
        assert!(anchor.ropables[0].try_acquire());
        let roper = spawn(&mut arena, roper);
        let anchor = spawn(&mut arena, anchor);
        let config = SimConfig::default();

        let result = try_lock_rope(&mut arena, roper, 0, &config);
        assert!(matches!(result, Err(SimError::InvalidTransition(_))));
        assert_eq!(arena.get(roper).unwrap().ropes()[0].state(), LockState::Unlocked);
        assert_eq!(arena.get(anchor).unwrap().ropables()[0].lock_count(), 1);

        arena.get_mut(anchor).unwrap().ropables[0].release();
        assert_eq!(try_lock_rope(&mut arena, roper, 0, &config), Ok(true));
        assert!(matches!(
            try_lock_rope(&mut arena, roper, 0, &config),
            Err(SimError::InvalidTransition(_))
        ));
        assert!(matches!(
            try_lock_rope(&mut arena, roper, 4, &config),
            Err(SimError::OutOfRange { .. })
        ));
    }

    #[test]
    fn tie_toggle_releases_whole_group() {
        let mut arena = Arena::new();
        let mut vehicle = truck(0.0);
        vehicle.add_tie(Tie::new(NodeId(0)).with_group(1)).unwrap();
        vehicle.add_tie(Tie::new(NodeId(0)).with_group(1)).unwrap();
        let mut anchor = truck(1.0);
        anchor.add_ropable(Ropable::new(NodeId(0)).multilock()).unwrap();
        let id = spawn(&mut arena, vehicle);
        let anchor = spawn(&mut arena, anchor);
        let config = SimConfig::default();

        arena.get_mut(id).unwrap().request_ties(Some(1), CouplingIntent::Toggle);
        resolve_requests(&mut arena, &config);
        assert!(arena.get(id).unwrap().ties().iter().all(|t| t.tying));
        assert_eq!(arena.get(anchor).unwrap().ropables()[0].lock_count(), 2);

        arena.get_mut(id).unwrap().request_ties(Some(1), CouplingIntent::Toggle);
        resolve_requests(&mut arena, &config);
        assert!(arena.get(id).unwrap().ties().iter().all(|t| !t.is_engaged()));
        assert!(!arena.get(anchor).unwrap().ropables()[0].in_use());
    }
}
