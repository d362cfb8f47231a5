//! A single soft-body vehicle: its node/beam network plus everything that
//! drives it (shocks, wheels, actuators, couplings, props).
//!
//! A vehicle is assembled with the `add_*` builders, checked once by
//! [`Vehicle::validate`] and then advanced by the world through the tick
//! phases below. Phase methods never return errors: indices were checked at
//! load time and are trusted afterwards.

use glam::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::actuator::{Command, Rigidifier, Rotator};
use crate::core::beam::{Beam, BeamId, Bounded};
use crate::core::node::{Node, NodeId, NodeRef};
use crate::core::prop::{AnimationInputs, Prop};
use crate::core::shock::{Shock, ShockFlags};
use crate::core::store::NodeBeamStore;
use crate::core::trigger::TriggerRole;
use crate::core::wheel::Wheel;
use crate::coupling::{
    coupling_beam, detach_beam, CouplingIntent, CouplingKind, CouplingRequest, CouplingUpdate, Hook, LockState,
    Ropable, RopableRef, Rope, Tie,
};
use crate::dynamics::actuators::{
    update_command_beams, update_commands, update_hydros, update_rotator_targets, HydroInputs,
};
use crate::dynamics::beams::accumulate_beam_forces;
use crate::dynamics::contact::resolve_ground_contacts;
use crate::dynamics::forces::{ForceGenerator, ForceRegistry};
use crate::dynamics::integrator::NodeIntegrator;
use crate::dynamics::rotational::{
    accumulate_rigidifier_forces, accumulate_rotator_forces, settle_rigidifiers,
};
use crate::dynamics::triggers::{evaluate_triggers, TriggerEffect};
use crate::dynamics::wheels::{apply_wheel_torques, update_wheel_state, WheelTorques};
use crate::dynamics::StepContext;
use crate::error::{Result, SimError};
use crate::events::SimEvent;
use crate::utils::allocator::VehicleId;

/// How the world treats a vehicle each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimState {
    /// Forces and integration run locally.
    #[default]
    Simulated,
    /// Driven by queued position overrides only.
    Networked,
    Sleeping,
    Invalid,
}

impl SimState {
    /// Whether couplings from other vehicles may attach to this one.
    pub fn accepts_couplings(self) -> bool {
        matches!(self, SimState::Simulated | SimState::Networked)
    }
}

/// Per-tick inputs from the player, AI or engine collaborator.
#[derive(Debug, Clone, Default)]
pub struct VehicleInputs {
    pub steering: f32,
    pub aileron: f32,
    pub rudder: f32,
    pub elevator: f32,
    /// Torque (N·m) at every propelled wheel.
    pub drive_torque: f32,
    /// Torque (N·m) at every braked wheel.
    pub brake_torque: f32,
    pub engine_running: bool,
    /// Command value scaling tie winching, in `[0, 1]`.
    pub tie_command: f32,
    pub animation: AnimationInputs,
}

/// Restorable simulation state of one vehicle. Couplings are not part of it:
/// coupling beams are recorded detached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub nodes: Vec<Node>,
    pub beams: Vec<Beam>,
    pub shocks: Vec<Shock>,
    pub commands: Vec<Command>,
    pub rotators: Vec<Rotator>,
    pub rigidifiers: Vec<Rigidifier>,
    pub wheels: Vec<Wheel>,
}

#[derive(Debug)]
pub struct Vehicle {
    pub(crate) id: VehicleId,
    pub name: String,
    pub state: SimState,
    pub inputs: VehicleInputs,
    pub(crate) store: NodeBeamStore,
    pub(crate) shocks: Vec<Shock>,
    pub(crate) wheels: Vec<Wheel>,
    pub(crate) commands: Vec<Command>,
    pub(crate) rotators: Vec<Rotator>,
    pub(crate) rigidifiers: Vec<Rigidifier>,
    pub(crate) props: Vec<Prop>,
    pub(crate) hooks: Vec<Hook>,
    pub(crate) ropes: Vec<Rope>,
    pub(crate) ties: Vec<Tie>,
    pub(crate) ropables: Vec<Ropable>,
    forces: ForceRegistry,
    pub(crate) requests: Vec<CouplingRequest>,
    /// Hooks whose auto-lock timer expired this tick.
    pub(crate) auto_lock: Vec<usize>,
    pub(crate) outbox: Vec<SimEvent>,
    needs_reset: bool,
    validated: bool,
}

impl Vehicle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: VehicleId::new(0, 0),
            name: name.into(),
            state: SimState::Simulated,
            inputs: VehicleInputs::default(),
            store: NodeBeamStore::new(),
            shocks: Vec::new(),
            wheels: Vec::new(),
            commands: Vec::new(),
            rotators: Vec::new(),
            rigidifiers: Vec::new(),
            props: Vec::new(),
            hooks: Vec::new(),
            ropes: Vec::new(),
            ties: Vec::new(),
            ropables: Vec::new(),
            forces: ForceRegistry::new(),
            requests: Vec::new(),
            auto_lock: Vec::new(),
            outbox: Vec::new(),
            needs_reset: false,
            validated: false,
        }
    }

    // ---------------------------------------------------------------------
    // Assembly
    // ---------------------------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.store.add_node(node)
    }

    pub fn add_beam(&mut self, beam: Beam) -> Result<BeamId> {
        self.store.add_beam(beam)
    }

    /// Attaches shock state to an existing beam. Trigger flags are rebuilt
    /// from the shock's trigger, so a role flag without a trigger is rejected.
    pub fn add_shock(&mut self, mut shock: Shock) -> Result<usize> {
        let index = self.shocks.len();
        let beam = self.store.beam_mut(shock.beam)?;
        match shock.trigger.as_ref() {
            Some(trigger) => {
                shock.flags.remove(ShockFlags::TRIGGER_ROLES);
                shock.flags.insert(trigger.shock_flags());
            }
            None if shock.flags.intersects(ShockFlags::TRIGGER_ROLES.with(ShockFlags::ISTRIGGER)) => {
                return Err(SimError::InvalidConfig(format!(
                    "shock on beam {} has trigger flags {:?} but no trigger",
                    shock.beam.0, shock.flags
                )));
            }
            None => {}
        }
        if shock.flags.contains(ShockFlags::ISSHOCK2) && beam.bounded == Bounded::NoShock {
            beam.bounded = Bounded::Shock2;
        }
        beam.shock = Some(index);
        self.shocks.push(shock);
        Ok(index)
    }

    pub fn add_wheel(&mut self, wheel: Wheel) -> Result<usize> {
        for node in wheel.all_nodes() {
            self.store.node(node)?;
        }
        self.wheels.push(wheel);
        Ok(self.wheels.len() - 1)
    }

    pub fn add_command(&mut self, command: Command) -> usize {
        self.commands.push(command);
        self.commands.len() - 1
    }

    pub fn add_rotator(&mut self, rotator: Rotator) -> Result<usize> {
        for node in rotator.all_nodes() {
            self.store.node(node)?;
        }
        self.rotators.push(rotator);
        Ok(self.rotators.len() - 1)
    }

    /// Makes `command` turn `rotator`; `direction` is +1 or -1.
    pub fn bind_rotator(&mut self, command: usize, rotator: usize, direction: f32) -> Result<()> {
        if rotator >= self.rotators.len() {
            return Err(SimError::out_of_range("rotator", rotator, self.rotators.len()));
        }
        let len = self.commands.len();
        let command = self
            .commands
            .get_mut(command)
            .ok_or_else(|| SimError::out_of_range("command", command, len))?;
        command.rotators.push((rotator, direction.signum()));
        Ok(())
    }

    pub fn add_rigidifier(&mut self, rigidifier: Rigidifier) -> Result<usize> {
        for node in [rigidifier.a, rigidifier.b, rigidifier.c] {
            self.store.node(node)?;
        }
        for beam in [rigidifier.beam_a, rigidifier.beam_c].into_iter().flatten() {
            self.store.beam(beam)?;
        }
        self.rigidifiers.push(rigidifier);
        Ok(self.rigidifiers.len() - 1)
    }

    pub fn add_prop(&mut self, prop: Prop) -> Result<usize> {
        for node in prop.node_ids() {
            self.store.node(node)?;
        }
        self.props.push(prop);
        Ok(self.props.len() - 1)
    }

    /// Adds a hook together with its detached coupling beam.
    pub fn add_hook(&mut self, mut hook: Hook) -> Result<usize> {
        self.store.node(hook.node)?;
        hook.beam = self
            .store
            .add_beam(coupling_beam(hook.node, hook.spring, hook.damp, Bounded::NoShock))?;
        self.hooks.push(hook);
        Ok(self.hooks.len() - 1)
    }

    pub fn add_rope(&mut self, mut rope: Rope) -> Result<usize> {
        self.store.node(rope.node)?;
        if !(rope.length > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "rope length must be positive, got {}",
                rope.length
            )));
        }
        rope.beam = self
            .store
            .add_beam(coupling_beam(rope.node, rope.spring, rope.damp, Bounded::Rope))?;
        self.store.beam_mut(rope.beam)?.ref_length = rope.length;
        self.ropes.push(rope);
        Ok(self.ropes.len() - 1)
    }

    pub fn add_tie(&mut self, mut tie: Tie) -> Result<usize> {
        self.store.node(tie.node)?;
        tie.beam = self
            .store
            .add_beam(coupling_beam(tie.node, tie.spring, tie.damp, Bounded::Rope))?;
        self.ties.push(tie);
        Ok(self.ties.len() - 1)
    }

    pub fn add_ropable(&mut self, ropable: Ropable) -> Result<usize> {
        self.store.node(ropable.node)?;
        self.ropables.push(ropable);
        Ok(self.ropables.len() - 1)
    }

    pub fn add_force<F: ForceGenerator + 'static>(&mut self, force: F) {
        self.forces.add_force(force);
    }

    /// Checks every cross reference and prepares derived state.
    ///
    /// Must succeed before the vehicle is simulated; the world calls it on
    /// spawn.
    pub fn validate(&mut self) -> Result<()> {
        self.store.validate()?;

        for command in &mut self.commands {
            command.beams.clear();
        }
        let command_count = self.commands.len();
        for (index, beam) in self.store.beams().iter().enumerate() {
            let Some(binding) = beam.command else {
                continue;
            };
            for key in [binding.short_key, binding.long_key] {
                let command = self
                    .commands
                    .get_mut(key)
                    .ok_or_else(|| SimError::out_of_range("command", key, command_count))?;
                let id = BeamId::from(index);
                if !command.beams.contains(&id) {
                    command.beams.push(id);
                }
            }
        }
        check_references(Layout {
            node_count: self.store.node_count(),
            beams: self.store.beams(),
            shocks: &self.shocks,
            commands: &self.commands,
            rotators: &self.rotators,
            rigidifiers: &self.rigidifiers,
            wheels: &self.wheels,
        })?;

        // Inverted blockers gate their range off until they first activate.
        let count = self.shocks.len();
        for index in 0..count {
            let range = match &self.shocks[index].trigger {
                Some(t) if t.role == TriggerRole::InvertedBlocker => t.cmd_short..=t.cmd_long,
                _ => continue,
            };
            for target in range {
                if target == index {
                    continue;
                }
                if let Some(trigger) = self.shocks[target].trigger.as_mut() {
                    trigger.enabled = false;
                }
            }
        }

        settle_rigidifiers(&mut self.rigidifiers, self.store.nodes());
        self.validated = true;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn store(&self) -> &NodeBeamStore {
        &self.store
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.store.node(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.store.node_mut(id)
    }

    pub fn beam(&self, id: BeamId) -> Result<&Beam> {
        self.store.beam(id)
    }

    pub fn shocks(&self) -> &[Shock] {
        &self.shocks
    }

    pub fn wheels(&self) -> &[Wheel] {
        &self.wheels
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn rotators(&self) -> &[Rotator] {
        &self.rotators
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    pub fn ropes(&self) -> &[Rope] {
        &self.ropes
    }

    pub fn ties(&self) -> &[Tie] {
        &self.ties
    }

    pub fn ropables(&self) -> &[Ropable] {
        &self.ropables
    }

    /// Set when a node went unstable; cleared by a restore.
    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    /// Mean rim speed of all wheels (m/s).
    pub fn wheel_speed(&self) -> f32 {
        if self.wheels.is_empty() {
            return 0.0;
        }
        self.wheels.iter().map(Wheel::speed).sum::<f32>() / self.wheels.len() as f32
    }

    pub fn set_command_input(&mut self, command: usize, value: f32) -> Result<()> {
        let len = self.commands.len();
        let command = self
            .commands
            .get_mut(command)
            .ok_or_else(|| SimError::out_of_range("command", command, len))?;
        command.player_input = value.clamp(0.0, 1.0);
        Ok(())
    }

    /// Queues a coupling request, resolved by the world after integration.
    pub fn request_coupling(&mut self, request: CouplingRequest) {
        self.requests.push(request);
    }

    pub fn request_hooks(&mut self, group: Option<i32>, intent: CouplingIntent) {
        self.request_coupling(CouplingRequest::new(CouplingKind::Hook, group, intent));
    }

    pub fn request_ropes(&mut self, group: Option<i32>, intent: CouplingIntent) {
        self.request_coupling(CouplingRequest::new(CouplingKind::Rope, group, intent));
    }

    pub fn request_ties(&mut self, group: Option<i32>, intent: CouplingIntent) {
        self.request_coupling(CouplingRequest::new(CouplingKind::Tie, group, intent));
    }

    pub(crate) fn emit(&mut self, event: SimEvent) {
        self.outbox.push(event);
    }

    pub(crate) fn node_position(&self, id: NodeId) -> Vec3 {
        self.store.nodes()[id.index()].position
    }

    /// Active beams whose far end sits on another node reference.
    pub(crate) fn coupling_beams(&self) -> Vec<(BeamId, NodeRef)> {
        self.store
            .beams()
            .iter()
            .enumerate()
            .filter(|(_, beam)| beam.is_active())
            .filter_map(|(index, beam)| beam.remote.map(|remote| (BeamId::from(index), remote)))
            .collect()
    }

    pub fn active_couplings(&self) -> usize {
        self.hooks.iter().filter(|h| h.cycle.is_engaged()).count()
            + self.ropes.iter().filter(|r| r.cycle.is_engaged()).count()
            + self.ties.iter().filter(|t| t.is_engaged()).count()
    }

    // ---------------------------------------------------------------------
    // Tick phases
    // ---------------------------------------------------------------------

    /// Actuator targets: commands, command beams, hydros and rotators.
    pub(crate) fn prepare(&mut self, ctx: &StepContext<'_>) {
        if self.state != SimState::Simulated {
            return;
        }
        let engine = self.inputs.engine_running;
        update_commands(&mut self.commands);
        update_command_beams(self.store.beams_mut(), &self.commands, engine, ctx.dt);
        let hydro_inputs = HydroInputs {
            steering: self.inputs.steering,
            aileron: self.inputs.aileron,
            rudder: self.inputs.rudder,
            elevator: self.inputs.elevator,
            speed: self.wheel_speed(),
        };
        update_hydros(self.store.beams_mut(), &hydro_inputs);
        update_rotator_targets(&mut self.rotators, &self.commands, engine, ctx.dt);
    }

    /// Internal forces of the vehicle. Coupling beams are left to the world.
    pub(crate) fn accumulate_forces(&mut self, ctx: &StepContext<'_>) {
        if self.state != SimState::Simulated {
            return;
        }
        let (nodes, beams) = self.store.split_mut();
        let report = accumulate_beam_forces(nodes, beams, &self.shocks, ctx.config);
        accumulate_rigidifier_forces(&mut self.rigidifiers, nodes, beams, ctx.dt);
        accumulate_rotator_forces(&self.rotators, nodes);
        apply_wheel_torques(
            &self.wheels,
            nodes,
            WheelTorques {
                drive: self.inputs.drive_torque,
                brake: self.inputs.brake_torque,
            },
        );
        self.forces.apply_all(nodes, ctx.dt);

        let vehicle = self.id;
        for beam in report.broken {
            debug!("💥 {} beam {} broke", vehicle, beam.0);
            self.outbox.push(SimEvent::BeamBroken { vehicle, beam });
        }
        for group in report.detached_groups {
            let beams = self.store.deactivate_detacher_group(group);
            debug!("💥 {} detacher group {} disabled ({} beams)", vehicle, group, beams);
            self.outbox.push(SimEvent::DetacherGroupDisabled { vehicle, group, beams });
        }
    }

    /// Gravity, ground contact and node integration.
    pub(crate) fn integrate(&mut self, ctx: &StepContext<'_>) {
        if self.state != SimState::Simulated {
            return;
        }
        let integrator = NodeIntegrator::from_config(ctx.config);
        let nodes = self.store.nodes_mut();
        integrator.apply_gravity(nodes, ctx.config.gravity);
        resolve_ground_contacts(nodes, ctx);
        let report = integrator.integrate(nodes);
        if !report.is_stable() {
            warn!(
                "{} has {} unstable node(s), clamped and flagged for reset",
                self.id,
                report.unstable.len()
            );
            self.needs_reset = true;
            let vehicle = self.id;
            self.outbox.extend(
                report
                    .unstable
                    .into_iter()
                    .map(|node| SimEvent::NumericInstability { vehicle, node }),
            );
        }
        update_wheel_state(&mut self.wheels, self.store.nodes());
    }

    fn coupling_changed(&mut self, kind: CouplingKind, index: usize, update: &CouplingUpdate) {
        if let Some(state) = update.changed {
            self.outbox.push(SimEvent::CouplingChanged {
                vehicle: self.id,
                kind,
                index,
                state,
            });
        }
    }

    /// Steps every hook, rope and tie. Returns the ropables they let go of.
    pub(crate) fn advance_couplings(&mut self, ctx: &StepContext<'_>) -> Vec<RopableRef> {
        let mut released = Vec::new();
        if !matches!(self.state, SimState::Simulated | SimState::Networked) {
            return released;
        }
        let tie_command = self.inputs.tie_command.clamp(0.0, 1.0);

        for index in 0..self.hooks.len() {
            let beam = &mut self.store.beams_mut()[self.hooks[index].beam.index()];
            let update = self.hooks[index].advance(beam, ctx.config, ctx.dt);
            if update.wants_lock {
                self.auto_lock.push(index);
            }
            released.extend(update.released);
            self.coupling_changed(CouplingKind::Hook, index, &update);
        }
        for index in 0..self.ropes.len() {
            let beam = &mut self.store.beams_mut()[self.ropes[index].beam.index()];
            let update = self.ropes[index].advance(beam, ctx.config, ctx.dt);
            released.extend(update.released);
            self.coupling_changed(CouplingKind::Rope, index, &update);
        }
        for index in 0..self.ties.len() {
            let beam = &mut self.store.beams_mut()[self.ties[index].beam.index()];
            let update = self.ties[index].advance(beam, tie_command, ctx.config, ctx.dt);
            self.coupling_changed(CouplingKind::Tie, index, &update);
        }
        released
    }

    /// Evaluates trigger beams; hook triggers become coupling requests.
    pub(crate) fn evaluate_triggers(&mut self, ctx: &StepContext<'_>) {
        if self.state != SimState::Simulated || self.shocks.is_empty() {
            return;
        }
        let effects = evaluate_triggers(&mut self.shocks, self.store.beams(), &mut self.commands, ctx.dt);
        let vehicle = self.id;
        for effect in effects {
            match effect {
                TriggerEffect::Engine { action, motor, value } => {
                    self.outbox.push(SimEvent::EngineAction {
                        vehicle,
                        action,
                        motor,
                        value,
                    });
                }
                TriggerEffect::Hook { group, lock } => {
                    let intent = if lock {
                        CouplingIntent::Lock
                    } else {
                        CouplingIntent::Unlock
                    };
                    self.requests
                        .push(CouplingRequest::new(CouplingKind::Hook, Some(group), intent));
                    self.outbox.push(SimEvent::HookRequest { vehicle, group, lock });
                }
                TriggerEffect::CommandBlock { command, blocked } => {
                    self.outbox.push(SimEvent::CommandBlock {
                        vehicle,
                        command,
                        blocked,
                    });
                }
            }
        }
    }

    pub(crate) fn update_props(&mut self, dt: f32) {
        if self.state == SimState::Invalid {
            return;
        }
        let nodes = self.store.nodes();
        for prop in &mut self.props {
            prop.update(nodes, &self.inputs.animation, dt);
        }
    }

    // ---------------------------------------------------------------------
    // Couplings
    // ---------------------------------------------------------------------

    /// Drops every coupling whose beam ends on a node matching `pred`, and
    /// returns the ropables they held.
    pub(crate) fn release_couplings_where<F>(&mut self, pred: F) -> Vec<RopableRef>
    where
        F: Fn(&NodeRef) -> bool,
    {
        let mut released = Vec::new();
        let vehicle = self.id;
        let (_, beams) = self.store.split_mut();
        let ends_on = |beam: &Beam| beam.remote.as_ref().is_some_and(&pred);

        for (index, hook) in self.hooks.iter_mut().enumerate() {
            let beam = &mut beams[hook.beam.index()];
            if hook.cycle.is_engaged() && ends_on(&*beam) {
                released.extend(hook.release(beam));
                self.outbox.push(SimEvent::CouplingChanged {
                    vehicle,
                    kind: CouplingKind::Hook,
                    index,
                    state: LockState::Unlocked,
                });
            }
        }
        for (index, rope) in self.ropes.iter_mut().enumerate() {
            let beam = &mut beams[rope.beam.index()];
            if rope.cycle.is_engaged() && ends_on(&*beam) {
                released.extend(rope.release(beam));
                self.outbox.push(SimEvent::CouplingChanged {
                    vehicle,
                    kind: CouplingKind::Rope,
                    index,
                    state: LockState::Unlocked,
                });
            }
        }
        for (index, tie) in self.ties.iter_mut().enumerate() {
            let beam = &mut beams[tie.beam.index()];
            if tie.is_engaged() && ends_on(&*beam) {
                released.extend(tie.release(beam));
                self.outbox.push(SimEvent::CouplingChanged {
                    vehicle,
                    kind: CouplingKind::Tie,
                    index,
                    state: LockState::Unlocked,
                });
            }
        }
        released
    }

    pub(crate) fn release_ropable(&mut self, index: usize) {
        if let Some(ropable) = self.ropables.get_mut(index) {
            ropable.release();
        }
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> VehicleSnapshot {
        let beams = self
            .store
            .beams()
            .iter()
            .map(|beam| {
                let mut beam = beam.clone();
                if beam.remote.take().is_some() {
                    beam.disabled = true;
                    beam.stress = 0.0;
                    beam.force_scale = 1.0;
                }
                beam
            })
            .collect();
        VehicleSnapshot {
            nodes: self.store.nodes().to_vec(),
            beams,
            shocks: self.shocks.clone(),
            commands: self.commands.clone(),
            rotators: self.rotators.clone(),
            rigidifiers: self.rigidifiers.clone(),
            wheels: self.wheels.clone(),
        }
    }

    /// Fails unless `snapshot` was taken from a vehicle of the same layout
    /// and every index it carries resolves within that layout.
    pub fn check_snapshot(&self, snapshot: &VehicleSnapshot) -> Result<()> {
        let shape = [
            ("node", snapshot.nodes.len(), self.store.node_count()),
            ("beam", snapshot.beams.len(), self.store.beam_count()),
            ("shock", snapshot.shocks.len(), self.shocks.len()),
            ("command", snapshot.commands.len(), self.commands.len()),
            ("rotator", snapshot.rotators.len(), self.rotators.len()),
            ("rigidifier", snapshot.rigidifiers.len(), self.rigidifiers.len()),
            ("wheel", snapshot.wheels.len(), self.wheels.len()),
        ];
        for (kind, got, expected) in shape {
            if got != expected {
                return Err(SimError::InvalidConfig(format!(
                    "snapshot has {got} {kind}s, vehicle has {expected}"
                )));
            }
        }
        if let Some(index) = snapshot
            .nodes
            .iter()
            .position(|n| !(n.position.is_finite() && n.velocity.is_finite()))
        {
            return Err(SimError::InvalidConfig(format!(
                "snapshot node {index} has a non-finite state"
            )));
        }
        check_references(Layout {
            node_count: snapshot.nodes.len(),
            beams: &snapshot.beams,
            shocks: &snapshot.shocks,
            commands: &snapshot.commands,
            rotators: &snapshot.rotators,
            rigidifiers: &snapshot.rigidifiers,
            wheels: &snapshot.wheels,
        })
    }

    /// Overwrites simulation state from `snapshot`. Engaged couplings must
    /// already have been released; the world does that before calling this.
    pub(crate) fn apply_snapshot(&mut self, snapshot: &VehicleSnapshot) -> Result<()> {
        self.check_snapshot(snapshot)?;
        let (nodes, beams) = self.store.split_mut();
        nodes.clone_from_slice(&snapshot.nodes);
        beams.clone_from_slice(&snapshot.beams);
        // Couplings were released above; their beams come back detached.
        for beam in beams.iter_mut() {
            beam.remote = None;
        }
        let coupling_beams = self
            .hooks
            .iter()
            .map(|h| h.beam)
            .chain(self.ropes.iter().map(|r| r.beam))
            .chain(self.ties.iter().map(|t| t.beam));
        for id in coupling_beams {
            detach_beam(&mut beams[id.index()]);
        }
        self.shocks.clone_from_slice(&snapshot.shocks);
        self.commands.clone_from_slice(&snapshot.commands);
        self.rotators.clone_from_slice(&snapshot.rotators);
        self.rigidifiers.clone_from_slice(&snapshot.rigidifiers);
        self.wheels.clone_from_slice(&snapshot.wheels);
        self.requests.clear();
        self.auto_lock.clear();
        self.needs_reset = false;
        Ok(())
    }
}

/// The indexed parts of a vehicle, borrowed from either a live vehicle or a
/// snapshot of one.
struct Layout<'a> {
    node_count: usize,
    beams: &'a [Beam],
    shocks: &'a [Shock],
    commands: &'a [Command],
    rotators: &'a [Rotator],
    rigidifiers: &'a [Rigidifier],
    wheels: &'a [Wheel],
}

/// Checks that every node, beam, shock, command and rotator index in `layout`
/// resolves, and that ranged triggers address an ordered range.
fn check_references(layout: Layout<'_>) -> Result<()> {
    let node_count = layout.node_count;
    let beam_count = layout.beams.len();
    let node = |id: NodeId| -> Result<()> {
        if id.index() < node_count {
            Ok(())
        } else {
            Err(SimError::out_of_range("node", id.index(), node_count))
        }
    };
    let beam = |id: BeamId| -> Result<()> {
        if id.index() < beam_count {
            Ok(())
        } else {
            Err(SimError::out_of_range("beam", id.index(), beam_count))
        }
    };
    let bounded = |kind: &'static str, index: usize, len: usize| -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(SimError::out_of_range(kind, index, len))
        }
    };

    for b in layout.beams {
        node(b.node_a)?;
        node(b.node_b)?;
        if let Some(binding) = b.command {
            bounded("command", binding.short_key, layout.commands.len())?;
            bounded("command", binding.long_key, layout.commands.len())?;
        }
    }

    for (index, shock) in layout.shocks.iter().enumerate() {
        beam(shock.beam)?;
        let Some(trigger) = &shock.trigger else {
            continue;
        };
        let (kind, len, ranged) = match trigger.role {
            TriggerRole::Blocker | TriggerRole::InvertedBlocker | TriggerRole::CommandSwitch => {
                ("trigger", layout.shocks.len(), true)
            }
            TriggerRole::CommandBlocker => ("command", layout.commands.len(), true),
            TriggerRole::Command => ("command", layout.commands.len(), false),
            TriggerRole::HookLock | TriggerRole::HookUnlock | TriggerRole::Engine(_) => continue,
        };
        bounded(kind, trigger.cmd_short, len)?;
        bounded(kind, trigger.cmd_long, len)?;
        if ranged && trigger.cmd_short > trigger.cmd_long {
            return Err(SimError::InvalidConfig(format!(
                "trigger on shock {index} targets the reversed {kind} range {}..={}",
                trigger.cmd_short, trigger.cmd_long
            )));
        }
    }

    for command in layout.commands {
        for &id in &command.beams {
            beam(id)?;
        }
        for &(rotator, _) in &command.rotators {
            bounded("rotator", rotator, layout.rotators.len())?;
        }
    }
    for rotator in layout.rotators {
        rotator.all_nodes().try_for_each(node)?;
    }
    for r in layout.rigidifiers {
        [r.a, r.b, r.c].into_iter().try_for_each(node)?;
        [r.beam_a, r.beam_c].into_iter().flatten().try_for_each(beam)?;
    }
    for wheel in layout.wheels {
        wheel.all_nodes().try_for_each(node)?;
    }
    Ok(())
}
