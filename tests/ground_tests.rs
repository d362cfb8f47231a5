use approx::assert_relative_eq;
use softrig::core::node::Moisture;
use softrig::dynamics::{friction_coefficient, FrictionRegime};
use softrig::*;

fn grounded_world(surface: &str, height: f32) -> (SimulationWorld, GroundModelId) {
    let world = SimulationWorld::new(SimConfig::default()).expect("valid config");
    let ground = world.grounds().find(surface).expect("stock surface");
    (world.with_terrain(FlatGround::new(height, ground)), ground)
}

#[test]
fn slow_slip_uses_static_coefficient() {
    let ground = GroundModel::solid("test", 0.1, 0.9, 0.5);
    let (mu, regime) = friction_coefficient(&ground, 0.05);
    assert_relative_eq!(mu, 0.9);
    assert_eq!(regime, FrictionRegime::Static);

    let (mu, regime) = friction_coefficient(&ground, 10.0);
    assert_eq!(regime, FrictionRegime::Sliding);
    assert_relative_eq!(mu, 0.5, epsilon = 1e-3);
}

#[test]
fn node_comes_to_rest_on_solid_ground() {
    let (mut world, _) = grounded_world("concrete", 0.0);
    let mut vehicle = Vehicle::new("pebble");
    vehicle.add_node(Node::new(Vec3::new(0.0, 0.01, 0.0), 10.0));
    let id = world.spawn(vehicle).unwrap();

    let mut touched = false;
    for _ in 0..2000 {
        world.tick();
        touched |= world.vehicle(id).unwrap().node(NodeId(0)).unwrap().contact_ground.is_some();
    }
    let node = world.vehicle(id).unwrap().node(NodeId(0)).unwrap();
    assert!(touched);
    assert!(node.position.y > -0.05 && node.position.y < 0.01, "y = {}", node.position.y);
    assert!(node.velocity.length() < 0.5);
}

#[test]
fn sliding_node_is_slowed_by_friction() {
    let (mut world, _) = grounded_world("concrete", 0.0);
    let mut vehicle = Vehicle::new("puck");
    vehicle.add_node(Node::new(Vec3::new(0.0, -0.001, 0.0), 1.0).with_velocity(Vec3::new(2.0, 0.0, 0.0)));
    let id = world.spawn(vehicle).unwrap();

    for _ in 0..4000 {
        world.tick();
    }
    let node = world.vehicle(id).unwrap().node(NodeId(0)).unwrap();
    assert!(node.velocity.x < 1.0, "vx = {}", node.velocity.x);
    assert!(node.velocity.x > -0.01);
}

#[test]
fn nodes_drip_after_leaving_fluid() {
    let (mut world, _) = grounded_world("water", 1.0);
    let mut vehicle = Vehicle::new("sponge");
    vehicle.add_node(Node::new(Vec3::new(0.0, 0.5, 0.0), 1.0));
    let id = world.spawn(vehicle).unwrap();

    world.tick();
    assert_eq!(world.vehicle(id).unwrap().node(NodeId(0)).unwrap().moisture, Moisture::Wet);

    world.set_terrain(NoTerrain);
    world.tick();
    assert_eq!(
        world.vehicle(id).unwrap().node(NodeId(0)).unwrap().moisture,
        Moisture::Dripping
    );
}

#[test]
fn wheel_reports_ground_contact() {
    let (mut world, concrete) = grounded_world("concrete", 0.0);
    let mut vehicle = Vehicle::new("wheel");
    let center = Vec3::new(0.0, 0.49, 0.0);
    let near = vehicle.add_node(Node::new(center - Vec3::Z * 0.1, 5.0));
    let far = vehicle.add_node(Node::new(center + Vec3::Z * 0.1, 5.0));
    let mut rim = Vec::new();
    for i in 0..8 {
        let angle = i as f32 * std::f32::consts::TAU / 8.0 - std::f32::consts::FRAC_PI_2;
        let offset = Vec3::new(angle.cos(), angle.sin(), 0.0) * 0.5;
        rim.push(vehicle.add_node(Node::new(center + offset, 1.0)));
    }
    vehicle.add_beam(Beam::new(near, far, 0.0, 1.0e6, 1.0e3)).unwrap();
    for (i, &node) in rim.iter().enumerate() {
        let next = rim[(i + 1) % rim.len()];
        vehicle.add_beam(Beam::new(node, next, 0.0, 1.0e6, 1.0e3)).unwrap();
        vehicle.add_beam(Beam::new(node, near, 0.0, 1.0e6, 1.0e3)).unwrap();
        vehicle.add_beam(Beam::new(node, far, 0.0, 1.0e6, 1.0e3)).unwrap();
    }
    vehicle.add_wheel(Wheel::new(rim, near, far, 0.5)).unwrap();
    let id = world.spawn(vehicle).unwrap();

    world.tick();
    let wheel = &world.vehicle(id).unwrap().wheels()[0];
    assert!(wheel.in_contact());
    assert_eq!(wheel.ground, Some(concrete));
}
