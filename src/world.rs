use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::{
    collision::terrain::{NoTerrain, TerrainQuery},
    config::SimConfig,
    core::{
        beam::BeamId,
        ground::GroundModelRegistry,
        node::{NodeId, NodeRef},
    },
    coupling::{
        resolve::{self, release_ropable},
        CouplingRequest,
    },
    dynamics::{evaluate_beam, StepContext},
    error::{Result, SimError},
    events::{EventQueue, EventSink},
    utils::{
        allocator::{Arena, VehicleId},
        logging::{warn_if_frame_budget_exceeded, PhaseTimer},
        profiling::StepProfiler,
    },
    vehicle::{SimState, Vehicle, VehicleSnapshot},
};

/// Authoritative node state received from elsewhere, e.g. a network peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOverride {
    pub vehicle: VehicleId,
    pub node: NodeId,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Overrides queued from any thread and applied at the next tick boundary.
#[derive(Debug, Default)]
pub struct OverrideQueue {
    pending: Mutex<Vec<PositionOverride>>,
}

impl OverrideQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, update: PositionOverride) {
        self.pending.lock().push(update);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn take(&self) -> Vec<PositionOverride> {
        std::mem::take(&mut *self.pending.lock())
    }
}

/// Owns every vehicle and advances them together at a fixed timestep.
pub struct SimulationWorld {
    config: SimConfig,
    grounds: GroundModelRegistry,
    terrain: Box<dyn TerrainQuery>,
    vehicles: Arena<Vehicle>,
    time_accumulated: f32,
    removals: Vec<VehicleId>,
    overrides: Arc<OverrideQueue>,
    events: Arc<EventQueue>,
    sink: Arc<dyn EventSink>,
    profiler: StepProfiler,
    parallel_enabled: bool,
}

impl Default for SimulationWorld {
    fn default() -> Self {
        Self::build(SimConfig::default())
    }
}

impl SimulationWorld {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let events = Arc::new(EventQueue::new());
        let mut world = Self {
            grounds: GroundModelRegistry::with_defaults(),
            terrain: Box::new(NoTerrain),
            vehicles: Arena::new(),
            time_accumulated: 0.0,
            removals: Vec::new(),
            overrides: Arc::new(OverrideQueue::new()),
            sink: events.clone(),
            events,
            profiler: StepProfiler::default(),
            parallel_enabled: false,
            config,
        };
        world.set_parallel_enabled(world.config.parallel);
        world
    }

    pub fn with_terrain<T>(mut self, terrain: T) -> Self
    where
        T: TerrainQuery + 'static,
    {
        self.terrain = Box::new(terrain);
        self
    }

    pub fn with_grounds(mut self, grounds: GroundModelRegistry) -> Self {
        self.grounds = grounds;
        self
    }

    pub fn set_terrain<T>(&mut self, terrain: T)
    where
        T: TerrainQuery + 'static,
    {
        self.terrain = Box::new(terrain);
    }

    /// Routes events to `sink` instead of the built-in queue.
    pub fn set_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        if enabled && !cfg!(feature = "parallel") {
            warn!("Parallel stepping requested but the `parallel` feature is disabled");
        }
        self.parallel_enabled = enabled && cfg!(feature = "parallel");
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grounds(&self) -> &GroundModelRegistry {
        &self.grounds
    }

    /// Events buffered by the built-in sink.
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Handle for queueing position overrides from other threads.
    pub fn overrides(&self) -> Arc<OverrideQueue> {
        Arc::clone(&self.overrides)
    }

    /// Figures for the most recent tick.
    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    // ---------------------------------------------------------------------
    // Vehicles
    // ---------------------------------------------------------------------

    /// Validates `vehicle` and adds it to the world.
    pub fn spawn(&mut self, mut vehicle: Vehicle) -> Result<VehicleId> {
        let id = self.vehicles.next_id();
        vehicle.id = id;
        vehicle.validate()?;
        info!(
            "🚚 spawned {} '{}' ({} nodes, {} beams)",
            id,
            vehicle.name,
            vehicle.store.node_count(),
            vehicle.store.beam_count()
        );
        Ok(self.vehicles.insert(vehicle))
    }

    /// Removes the vehicle at the next tick boundary.
    pub fn request_removal(&mut self, id: VehicleId) -> Result<()> {
        if !self.vehicles.contains(id) {
            return Err(SimError::UnknownVehicle(id));
        }
        if !self.removals.contains(&id) {
            self.removals.push(id);
        }
        Ok(())
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> + '_ {
        self.vehicles.iter()
    }

    pub fn vehicle_ids(&self) -> Vec<VehicleId> {
        self.vehicles.ids()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Queues a coupling request; it is resolved during the next tick.
    pub fn request_coupling(&mut self, vehicle: VehicleId, request: CouplingRequest) -> Result<()> {
        self.vehicles
            .get_mut(vehicle)
            .ok_or(SimError::UnknownVehicle(vehicle))?
            .request_coupling(request);
        Ok(())
    }

    /// Locks one rope immediately, reporting why it could not.
    pub fn try_lock_rope(&mut self, vehicle: VehicleId, rope: usize) -> Result<bool> {
        let locked = resolve::try_lock_rope(&mut self.vehicles, vehicle, rope, &self.config)?;
        self.flush_events();
        Ok(locked)
    }

    pub fn snapshot_vehicle(&self, id: VehicleId) -> Result<VehicleSnapshot> {
        self.vehicles
            .get(id)
            .map(Vehicle::snapshot)
            .ok_or(SimError::UnknownVehicle(id))
    }

    /// Rewinds a vehicle to `snapshot`. Every coupling touching it is released.
    pub fn restore_vehicle(&mut self, id: VehicleId, snapshot: &VehicleSnapshot) -> Result<()> {
        self.vehicles
            .get(id)
            .ok_or(SimError::UnknownVehicle(id))?
            .check_snapshot(snapshot)?;
        detach_vehicle(&mut self.vehicles, id);
        if let Some(vehicle) = self.vehicles.get_mut(id) {
            vehicle.apply_snapshot(snapshot)?;
        }
        debug!("{id} restored from snapshot");
        self.flush_events();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Stepping
    // ---------------------------------------------------------------------

    /// Advances by `dt` seconds of wall time using a fixed-step accumulator.
    /// Returns the number of ticks run.
    pub fn step(&mut self, dt: f32) -> u32 {
        if !(dt.is_finite() && dt > 0.0) {
            return 0;
        }
        let started = Instant::now();
        self.time_accumulated += dt;

        let mut ticks = 0;
        while self.time_accumulated >= self.config.time_step {
            if ticks == self.config.max_ticks_per_step {
                warn!(
                    "Dropping {:.4}s of simulation backlog after {} ticks",
                    self.time_accumulated, ticks
                );
                self.time_accumulated = 0.0;
                break;
            }
            self.time_accumulated -= self.config.time_step;
            self.tick();
            ticks += 1;
        }

        if ticks > 0 {
            self.profiler.log_summary();
        }
        warn_if_frame_budget_exceeded(started.elapsed(), self.config.frame_budget_ms);
        ticks
    }

    /// Runs exactly one fixed timestep.
    pub fn tick(&mut self) {
        let tick_start = Instant::now();
        self.profiler.reset();
        self.apply_removals();
        self.apply_overrides();

        let ctx = StepContext::new(&self.config, &self.grounds, self.terrain.as_ref());
        let parallel = self.parallel_enabled;

        {
            let _timer = PhaseTimer::recording("forces", &mut self.profiler.force_time);
            run_vehicles(&mut self.vehicles, parallel, |vehicle| {
                vehicle.prepare(&ctx);
                vehicle.accumulate_forces(&ctx);
            });
        }
        {
            let _timer = PhaseTimer::recording("couplings::forces", &mut self.profiler.coupling_force_time);
            accumulate_coupling_forces(&mut self.vehicles, &self.config);
        }
        {
            let _timer = PhaseTimer::recording("integrate", &mut self.profiler.integrate_time);
            run_vehicles(&mut self.vehicles, parallel, |vehicle| vehicle.integrate(&ctx));
        }
        {
            let _timer = PhaseTimer::recording("couplings::update", &mut self.profiler.coupling_update_time);
            let mut released = Vec::new();
            for vehicle in self.vehicles.iter_mut() {
                released.extend(vehicle.advance_couplings(&ctx));
            }
            for ropable in released {
                release_ropable(&mut self.vehicles, ropable);
            }
            resolve::resolve_requests(&mut self.vehicles, &self.config);
        }
        {
            let _timer = PhaseTimer::recording("triggers", &mut self.profiler.trigger_time);
            for vehicle in self.vehicles.iter_mut() {
                vehicle.evaluate_triggers(&ctx);
            }
        }
        {
            let _timer = PhaseTimer::recording("props", &mut self.profiler.prop_time);
            for vehicle in self.vehicles.iter_mut() {
                vehicle.update_props(ctx.dt);
            }
        }

        self.profiler.event_count = self.flush_events();
        for vehicle in self.vehicles.iter() {
            self.profiler.vehicle_count += 1;
            self.profiler.node_count += vehicle.store.node_count();
            self.profiler.beam_count += vehicle.store.beam_count();
            self.profiler.active_couplings += vehicle.active_couplings();
        }
        self.profiler.total_tick_time = tick_start.elapsed();
    }

    /// Forwards every vehicle's pending events to the sink, in slot order.
    fn flush_events(&mut self) -> usize {
        let mut count = 0;
        for vehicle in self.vehicles.iter_mut() {
            for event in vehicle.outbox.drain(..) {
                self.sink.emit(event);
                count += 1;
            }
        }
        count
    }

    fn apply_removals(&mut self) {
        for id in std::mem::take(&mut self.removals) {
            detach_vehicle(&mut self.vehicles, id);
            if let Some(mut vehicle) = self.vehicles.remove(id) {
                for event in vehicle.outbox.drain(..) {
                    self.sink.emit(event);
                }
                info!("🚚 removed {} '{}'", id, vehicle.name);
            }
        }
    }

    fn apply_overrides(&mut self) {
        for update in self.overrides.take() {
            let Some(vehicle) = self.vehicles.get_mut(update.vehicle) else {
                debug!("Dropping override for missing {}", update.vehicle);
                continue;
            };
            match vehicle.store.node_mut(update.node) {
                Ok(node) => {
                    node.position = update.position;
                    node.velocity = update.velocity;
                    node.forces = Vec3::ZERO;
                }
                Err(err) => debug!("Dropping override for {}: {err}", update.vehicle),
            }
        }
    }
}

/// Releases every coupling held by `id` and every coupling ending on it.
fn detach_vehicle(vehicles: &mut Arena<Vehicle>, id: VehicleId) {
    let mut freed = Vec::new();
    if let Some(vehicle) = vehicles.get_mut(id) {
        freed.extend(vehicle.release_couplings_where(|_| true));
    }
    for other in vehicles.iter_mut() {
        if other.id() != id {
            freed.extend(other.release_couplings_where(|remote| remote.vehicle == id));
        }
    }
    for ropable in freed {
        release_ropable(vehicles, ropable);
    }
}

/// Evaluates coupling beams once both vehicles have finished their own forces.
/// Force only lands on simulated vehicles.
fn accumulate_coupling_forces(vehicles: &mut Arena<Vehicle>, config: &SimConfig) {
    for owner in vehicles.ids() {
        let Some(links) = vehicles.get(owner).map(Vehicle::coupling_beams) else {
            continue;
        };
        for (beam, remote) in links {
            if remote.vehicle == owner {
                if let Some(vehicle) = vehicles.get_mut(owner) {
                    couple_within(vehicle, beam, remote.node, config);
                }
            } else if let Some((local, far)) = vehicles.get2_mut(owner, remote.vehicle) {
                couple_between(local, far, beam, remote, config);
            }
        }
    }
}

fn couple_within(vehicle: &mut Vehicle, beam: BeamId, far: NodeId, config: &SimConfig) {
    let simulated = vehicle.state == SimState::Simulated;
    let (nodes, beams) = vehicle.store.split_mut();
    let beam = &mut beams[beam.index()];
    let (ia, ib) = (beam.node_a.index(), far.index());
    if ib >= nodes.len() {
        return;
    }
    let result = evaluate_beam(
        beam,
        None,
        (nodes[ia].position, nodes[ia].velocity),
        (nodes[ib].position, nodes[ib].velocity),
        config,
    );
    beam.length = result.length;
    beam.stress = result.stress;
    if simulated {
        let force = result.force() * beam.force_scale;
        nodes[ia].forces += force;
        nodes[ib].forces -= force;
    }
}

fn couple_between(local: &mut Vehicle, far: &mut Vehicle, beam: BeamId, remote: NodeRef, config: &SimConfig) {
    let Some(far_node) = far.store.nodes().get(remote.node.index()) else {
        return;
    };
    let b = (far_node.position, far_node.velocity);
    let local_simulated = local.state == SimState::Simulated;
    let (nodes, beams) = local.store.split_mut();
    let beam = &mut beams[beam.index()];
    let ia = beam.node_a.index();
    let result = evaluate_beam(beam, None, (nodes[ia].position, nodes[ia].velocity), b, config);
    beam.length = result.length;
    beam.stress = result.stress;

    let force = result.force() * beam.force_scale;
    if local_simulated {
        nodes[ia].forces += force;
    }
    if far.state == SimState::Simulated {
        far.store.nodes_mut()[remote.node.index()].forces -= force;
    }
}

#[cfg(feature = "parallel")]
fn run_vehicles<F>(vehicles: &mut Arena<Vehicle>, parallel: bool, f: F)
where
    F: Fn(&mut Vehicle) + Send + Sync,
{
    use rayon::prelude::*;
    if parallel {
        vehicles.par_iter_mut().for_each(|vehicle| f(vehicle));
    } else {
        vehicles.iter_mut().for_each(f);
    }
}

#[cfg(not(feature = "parallel"))]
fn run_vehicles<F>(vehicles: &mut Arena<Vehicle>, _parallel: bool, f: F)
where
    F: Fn(&mut Vehicle),
{
    vehicles.iter_mut().for_each(f);
}
