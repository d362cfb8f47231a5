use softrig::*;

fn main() {
    let mut sim = Simulation::new(SimConfig::weightless()).unwrap();

    let mut vehicle = Vehicle::new("spring");
    let a = vehicle.add_node(Node::new(Vec3::ZERO, 1.0));
    let b = vehicle.add_node(Node::new(Vec3::new(1.2, 0.0, 0.0), 1.0));
    vehicle.add_beam(Beam::new(a, b, 1.0, 1000.0, 10.0)).unwrap();
    let id = sim.spawn(vehicle).unwrap();

    for frame in 0..30 {
        sim.step(1.0 / 60.0);
        let vehicle = sim.vehicle(id).unwrap();
        let length = vehicle
            .node(a)
            .unwrap()
            .position
            .distance(vehicle.node(b).unwrap().position);
        println!("frame {frame:2}: beam length {length:.4}");
    }
}
