use softrig::*;

fn pair(name: &str, x: f32) -> Vehicle {
    let mut vehicle = Vehicle::new(name);
    let a = vehicle.add_node(Node::new(Vec3::new(x, 0.3, 0.0), 100.0));
    let b = vehicle.add_node(Node::new(Vec3::new(x + 1.0, 0.3, 0.0), 100.0));
    vehicle.add_beam(Beam::new(a, b, 0.0, 1.0e6, 1.0e4)).unwrap();
    vehicle
}

fn main() {
    let world = SimulationWorld::new(SimConfig::default()).unwrap();
    let asphalt = world.grounds().find("asphalt").unwrap();
    let mut world = world.with_terrain(FlatGround::new(0.0, asphalt));

    let mut truck = pair("truck", 0.0);
    truck
        .add_hook(Hook::new(NodeId(1)).with_range(0.6, 1.0))
        .unwrap();
    truck.add_force(UniformForce::new(Vec3::new(-4.0, 0.0, 0.0)));
    let mut trailer = pair("trailer", 1.5);
    trailer.add_ropable(Ropable::new(NodeId(0))).unwrap();

    let truck = world.spawn(truck).unwrap();
    let trailer = world.spawn(trailer).unwrap();

    world
        .request_coupling(truck, CouplingRequest::new(CouplingKind::Hook, None, CouplingIntent::Lock))
        .unwrap();

    for second in 1..=3 {
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        let x = world.vehicle(trailer).unwrap().node(NodeId(0)).unwrap().position.x;
        println!(
            "t={second}s hook {:?}, trailer front at x={x:.3}",
            world.vehicle(truck).unwrap().hooks()[0].state()
        );
    }

    for event in world.events().drain() {
        if let SimEvent::CouplingChanged { kind, state, .. } = event {
            println!("{kind:?} -> {state:?}");
        }
    }
}
