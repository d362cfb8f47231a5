use softrig::*;

fn pair(name: &str, x: f32, mass: f32) -> Vehicle {
    let mut vehicle = Vehicle::new(name);
    let a = vehicle.add_node(Node::new(Vec3::new(x, 0.0, 0.0), mass));
    let b = vehicle.add_node(Node::new(Vec3::new(x + 1.0, 0.0, 0.0), mass));
    vehicle
        .add_beam(Beam::new(a, b, 0.0, 1_000_000.0, 10_000.0))
        .expect("beam between existing nodes");
    vehicle
}

fn weightless_world() -> SimulationWorld {
    SimulationWorld::new(SimConfig::weightless()).expect("valid config")
}

fn run(world: &mut SimulationWorld, ticks: usize) {
    for _ in 0..ticks {
        world.tick();
    }
}

fn hook_state(world: &SimulationWorld, id: VehicleId) -> LockState {
    world.vehicle(id).unwrap().hooks()[0].state()
}

#[test]
fn hook_out_of_range_never_prelocks() {
    let mut world = weightless_world();
    let mut tow = pair("tow", 0.0, 100.0);
    tow.add_hook(Hook::new(NodeId(1)).with_range(0.4, 1.0)).unwrap();
    let mut trailer = pair("trailer", 3.0, 100.0);
    trailer.add_ropable(Ropable::new(NodeId(0))).unwrap();
    let tow = world.spawn(tow).unwrap();
    let trailer = world.spawn(trailer).unwrap();

    world.vehicle_mut(tow).unwrap().request_hooks(None, CouplingIntent::Lock);
    run(&mut world, 10);

    assert_eq!(hook_state(&world, tow), LockState::Unlocked);
    assert!(!world.vehicle(trailer).unwrap().ropables()[0].in_use());
    assert!(world
        .events()
        .drain()
        .iter()
        .all(|e| !matches!(e, SimEvent::CouplingChanged { .. })));
}

#[test]
fn busy_ropable_rejects_second_rope() {
    let mut world = weightless_world();
    let mut first = pair("first", 0.0, 10.0);
    first.add_rope(Rope::new(NodeId(1), 1.0)).unwrap();
    let mut second = pair("second", 3.0, 10.0);
    second.add_rope(Rope::new(NodeId(0), 1.0)).unwrap();
    let mut post = Vehicle::new("post");
    post.add_node(Node::fixed(Vec3::new(2.0, 0.0, 0.0)));
    post.add_ropable(Ropable::new(NodeId(0))).unwrap();

    let first = world.spawn(first).unwrap();
    let second = world.spawn(second).unwrap();
    let post = world.spawn(post).unwrap();

    assert_eq!(world.try_lock_rope(first, 0), Ok(true));
    let contested = world.try_lock_rope(second, 0);
    assert!(matches!(contested, Err(SimError::InvalidTransition(_))));

    assert_eq!(world.vehicle(second).unwrap().ropes()[0].state(), LockState::Unlocked);
    let ropable = &world.vehicle(post).unwrap().ropables()[0];
    assert!(ropable.in_use());
    assert_eq!(ropable.lock_count(), 1);
}

#[test]
fn tie_with_zero_command_never_tightens() {
    let mut world = weightless_world();
    let mut rig = pair("rig", 0.0, 50.0);
    rig.add_tie(Tie::new(NodeId(1)).with_range(1.5)).unwrap();
    let mut anchor = Vehicle::new("anchor");
    anchor.add_node(Node::fixed(Vec3::new(2.0, 0.0, 0.0)));
    anchor.add_ropable(Ropable::new(NodeId(0))).unwrap();
    let rig = world.spawn(rig).unwrap();
    world.spawn(anchor).unwrap();

    world.vehicle_mut(rig).unwrap().request_ties(None, CouplingIntent::Lock);
    run(&mut world, 2000);

    let tie = &world.vehicle(rig).unwrap().ties()[0];
    assert!(tie.tying);
    assert!(!tie.tied);
    let beam = world.vehicle(rig).unwrap().beam(tie.beam).unwrap();
    assert_eq!(beam.rest_length, 1.0);

    world.vehicle_mut(rig).unwrap().inputs.tie_command = 1.0;
    run(&mut world, 4000);
    assert!(world.vehicle(rig).unwrap().ties()[0].tied);
}

#[test]
fn hook_tows_trailer_across_vehicles() {
    let mut world = weightless_world();
    let mut tow = pair("tow", 0.0, 100.0);
    tow.add_hook(Hook::new(NodeId(1)).with_range(0.6, 1.0)).unwrap();
    tow.add_force(UniformForce::new(Vec3::new(-10.0, 0.0, 0.0)));
    let mut trailer = pair("trailer", 1.5, 100.0);
    trailer.add_ropable(Ropable::new(NodeId(0))).unwrap();
    let tow = world.spawn(tow).unwrap();
    let trailer = world.spawn(trailer).unwrap();

    world.vehicle_mut(tow).unwrap().request_hooks(None, CouplingIntent::Lock);
    world.tick();
    assert_eq!(hook_state(&world, tow), LockState::PreLock);
    assert!(world.vehicle(trailer).unwrap().ropables()[0].in_use());

    run(&mut world, 2000);
    assert_eq!(hook_state(&world, tow), LockState::Locked);

    let hook_node = world.vehicle(tow).unwrap().node(NodeId(1)).unwrap().position;
    let towed = world.vehicle(trailer).unwrap().node(NodeId(0)).unwrap().position;
    assert!(hook_node.distance(towed) < 0.1, "gap {}", hook_node.distance(towed));
    assert!(towed.x < 1.0, "trailer should have followed, x = {}", towed.x);

    let events = world.events().drain();
    assert!(events.contains(&SimEvent::CouplingChanged {
        vehicle: tow,
        kind: CouplingKind::Hook,
        index: 0,
        state: LockState::Locked,
    }));
}

#[test]
fn hook_unlock_ramps_down_then_frees_ropable() {
    let mut world = weightless_world();
    let mut tow = pair("tow", 0.0, 100.0);
    tow.add_hook(Hook::new(NodeId(1)).with_range(0.6, 1.0)).unwrap();
    let mut trailer = pair("trailer", 1.5, 100.0);
    trailer.add_ropable(Ropable::new(NodeId(0))).unwrap();
    let tow = world.spawn(tow).unwrap();
    let trailer = world.spawn(trailer).unwrap();

    world.vehicle_mut(tow).unwrap().request_hooks(None, CouplingIntent::Lock);
    run(&mut world, 2000);
    assert_eq!(hook_state(&world, tow), LockState::Locked);

    world.vehicle_mut(tow).unwrap().request_hooks(None, CouplingIntent::Toggle);
    world.tick();
    assert_eq!(hook_state(&world, tow), LockState::PreUnlock);
    assert!(world.vehicle(trailer).unwrap().ropables()[0].in_use());

    let ramp_ticks = (world.config().unlock_ramp_time / world.config().time_step) as usize;
    run(&mut world, ramp_ticks + 2);
    assert_eq!(hook_state(&world, tow), LockState::Unlocked);
    assert!(!world.vehicle(trailer).unwrap().ropables()[0].in_use());
}

#[test]
fn sleeping_vehicles_cannot_be_hooked() {
    let mut world = weightless_world();
    let mut tow = pair("tow", 0.0, 100.0);
    tow.add_hook(Hook::new(NodeId(1)).with_range(0.6, 1.0)).unwrap();
    let mut trailer = pair("trailer", 1.5, 100.0);
    trailer.add_ropable(Ropable::new(NodeId(0))).unwrap();
    trailer.state = SimState::Sleeping;
    let tow = world.spawn(tow).unwrap();
    world.spawn(trailer).unwrap();

    world.vehicle_mut(tow).unwrap().request_hooks(None, CouplingIntent::Lock);
    run(&mut world, 5);
    assert_eq!(hook_state(&world, tow), LockState::Unlocked);
}
