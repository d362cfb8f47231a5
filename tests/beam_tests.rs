use approx::assert_relative_eq;
use softrig::*;

fn spring_pair(separation: f32) -> (SimulationWorld, VehicleId) {
    let mut world = SimulationWorld::new(SimConfig::weightless()).expect("valid config");
    let mut vehicle = Vehicle::new("pair");
    let a = vehicle.add_node(Node::new(Vec3::ZERO, 1.0));
    let b = vehicle.add_node(Node::new(Vec3::new(separation, 0.0, 0.0), 1.0));
    vehicle
        .add_beam(Beam::new(a, b, 1.0, 1000.0, 10.0))
        .expect("beam between existing nodes");
    let id = world.spawn(vehicle).expect("vehicle should validate");
    (world, id)
}

fn separation(world: &SimulationWorld, id: VehicleId) -> f32 {
    let vehicle = world.vehicle(id).expect("vehicle should exist");
    let a = vehicle.node(NodeId(0)).unwrap().position;
    let b = vehicle.node(NodeId(1)).unwrap().position;
    a.distance(b)
}

#[test]
fn stretched_pair_accelerates_inward() {
    let (mut world, id) = spring_pair(1.2);
    world.tick();

    let vehicle = world.vehicle(id).unwrap();
    let va = vehicle.node(NodeId(0)).unwrap().velocity;
    let vb = vehicle.node(NodeId(1)).unwrap().velocity;
    // 1000 N/m * 0.2 m on 1 kg for one 0.5 ms tick.
    assert_relative_eq!(va.x, 0.1, epsilon = 1e-4);
    assert_relative_eq!(vb.x, -0.1, epsilon = 1e-4);
    assert!(separation(&world, id) < 1.2);
}

#[test]
fn stretched_pair_settles_at_rest_length() {
    let (mut world, id) = spring_pair(1.2);
    for _ in 0..4000 {
        world.tick();
    }
    assert_relative_eq!(separation(&world, id), 1.0, epsilon = 1e-3);

    let vehicle = world.vehicle(id).unwrap();
    assert!(vehicle.node(NodeId(0)).unwrap().velocity.length() < 1e-3);
    assert!(vehicle.beam(BeamId(0)).unwrap().stress.abs() < 1.0);
}

#[test]
fn beam_forces_conserve_momentum() {
    let mut world = SimulationWorld::new(SimConfig::weightless()).unwrap();
    let mut vehicle = Vehicle::new("triangle");
    let masses = [1.0, 3.0, 7.5];
    let a = vehicle.add_node(Node::new(Vec3::new(0.0, 0.0, 0.0), masses[0]));
    let b = vehicle.add_node(Node::new(Vec3::new(1.3, 0.2, 0.0), masses[1]));
    let c = vehicle.add_node(Node::new(Vec3::new(0.4, 1.1, 0.3), masses[2]));
    vehicle.add_beam(Beam::new(a, b, 1.0, 2000.0, 20.0)).unwrap();
    vehicle.add_beam(Beam::new(b, c, 1.0, 2000.0, 20.0)).unwrap();
    vehicle.add_beam(Beam::new(c, a, 1.0, 2000.0, 20.0)).unwrap();
    let id = world.spawn(vehicle).unwrap();

    for _ in 0..500 {
        world.tick();
        let vehicle = world.vehicle(id).unwrap();
        let momentum: Vec3 = (0..3)
            .map(|i| vehicle.node(NodeId(i as u32)).unwrap().velocity * masses[i])
            .sum();
        assert!(momentum.length() < 1e-3, "momentum drifted to {momentum:?}");
    }
}

#[test]
fn overloaded_beam_breaks_and_disables_its_group() {
    let mut world = SimulationWorld::new(SimConfig::weightless()).unwrap();
    let mut vehicle = Vehicle::new("fragile");
    let a = vehicle.add_node(Node::new(Vec3::ZERO, 1.0));
    let b = vehicle.add_node(Node::new(Vec3::new(1.5, 0.0, 0.0), 1.0));
    let c = vehicle.add_node(Node::new(Vec3::new(1.5, 1.0, 0.0), 1.0));
    vehicle
        .add_beam(
            Beam::new(a, b, 1.0, 1000.0, 0.0)
                .with_strength(100.0)
                .with_detacher_group(3),
        )
        .unwrap();
    vehicle
        .add_beam(Beam::new(b, c, 0.0, 1000.0, 0.0).with_detacher_group(3))
        .unwrap();
    let id = world.spawn(vehicle).unwrap();

    world.tick();

    let vehicle = world.vehicle(id).unwrap();
    let snapped = vehicle.beam(BeamId(0)).unwrap();
    assert!(snapped.broken && snapped.disabled);
    assert!(vehicle.beam(BeamId(1)).unwrap().disabled);

    let events = world.events().drain();
    assert!(events.contains(&SimEvent::BeamBroken {
        vehicle: id,
        beam: BeamId(0)
    }));
    assert!(events.contains(&SimEvent::DetacherGroupDisabled {
        vehicle: id,
        group: 3,
        beams: 1
    }));
}

#[test]
fn rope_beam_goes_slack_under_compression() {
    let mut world = SimulationWorld::new(SimConfig::weightless()).unwrap();
    let mut vehicle = Vehicle::new("slack");
    let a = vehicle.add_node(Node::new(Vec3::ZERO, 1.0));
    let b = vehicle.add_node(Node::new(Vec3::new(0.5, 0.0, 0.0), 1.0));
    vehicle
        .add_beam(Beam::new(a, b, 1.0, 1000.0, 10.0).with_bounds(Bounded::Rope, 0.0, 0.0))
        .unwrap();
    let id = world.spawn(vehicle).unwrap();

    world.tick();
    let vehicle = world.vehicle(id).unwrap();
    assert_eq!(vehicle.node(NodeId(0)).unwrap().velocity, Vec3::ZERO);
    assert_eq!(vehicle.node(NodeId(1)).unwrap().velocity, Vec3::ZERO);
}
