use softrig::*;
use std::sync::Arc;
use std::thread;

fn truss(x: f32) -> Vehicle {
    let mut vehicle = Vehicle::new("truss");
    let mut previous = None;
    for i in 0..6 {
        let top = vehicle.add_node(Node::new(Vec3::new(x + i as f32 * 0.5, 1.0, 0.0), 20.0));
        let bottom = vehicle.add_node(Node::new(Vec3::new(x + i as f32 * 0.5, 0.4, 0.0), 20.0));
        vehicle.add_beam(Beam::new(top, bottom, 0.0, 5.0e5, 800.0)).unwrap();
        if let Some((prev_top, prev_bottom)) = previous {
            vehicle.add_beam(Beam::new(prev_top, top, 0.0, 5.0e5, 800.0)).unwrap();
            vehicle.add_beam(Beam::new(prev_bottom, bottom, 0.0, 5.0e5, 800.0)).unwrap();
            vehicle.add_beam(Beam::new(prev_top, bottom, 0.0, 5.0e5, 800.0)).unwrap();
        }
        previous = Some((top, bottom));
    }
    vehicle
}

fn fleet(parallel: bool) -> (SimulationWorld, Vec<VehicleId>) {
    let config = SimConfig {
        parallel,
        ..SimConfig::default().with_time_step(1.0 / 1024.0)
    };
    let world = SimulationWorld::new(config).unwrap();
    let grass = world.grounds().find("grass").unwrap();
    let mut world = world.with_terrain(FlatGround::new(0.0, grass));
    let ids = (0..8)
        .map(|i| world.spawn(truss(i as f32 * 5.0)).unwrap())
        .collect();
    (world, ids)
}

fn positions(world: &SimulationWorld, ids: &[VehicleId]) -> Vec<Vec3> {
    ids.iter()
        .flat_map(|&id| world.vehicle(id).unwrap().store().nodes().iter().map(|n| n.position))
        .collect()
}

#[test]
fn world_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SimulationWorld>();
    assert_send_sync::<Simulation>();
    assert_send_sync::<OverrideQueue>();
    assert_send_sync::<EventQueue>();
}

#[test]
fn parallel_step_matches_sequential() {
    let (mut sequential, ids) = fleet(false);
    let (mut parallel, parallel_ids) = fleet(true);
    assert!(!sequential.parallel_enabled());
    assert_eq!(parallel.parallel_enabled(), cfg!(feature = "parallel"));

    for _ in 0..500 {
        sequential.tick();
        parallel.tick();
    }
    assert_eq!(positions(&sequential, &ids), positions(&parallel, &parallel_ids));
}

#[test]
fn overrides_from_other_threads_land_at_next_tick() {
    let mut world = SimulationWorld::new(SimConfig::weightless()).unwrap();
    let ids: Vec<_> = (0..4)
        .map(|i| {
            let mut probe = Vehicle::new("probe");
            probe.add_node(Node::new(Vec3::new(i as f32 * 5.0, 1.0, 0.0), 1.0));
            world.spawn(probe).unwrap()
        })
        .collect();

    let queue = world.overrides();
    let handles: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, &vehicle)| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                queue.push(PositionOverride {
                    vehicle,
                    node: NodeId(0),
                    position: Vec3::new(i as f32, 10.0, 0.0),
                    velocity: Vec3::ZERO,
                });
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(queue.len(), 4);

    world.tick();
    assert!(queue.is_empty());
    for (i, &id) in ids.iter().enumerate() {
        let node = world.vehicle(id).unwrap().node(NodeId(0)).unwrap();
        assert_eq!(node.position, Vec3::new(i as f32, 10.0, 0.0));
        assert_eq!(node.velocity, Vec3::ZERO);
    }
}

#[test]
fn shared_world_steps_from_worker_threads() {
    let (world, ids) = fleet(false);
    let world = Arc::new(parking_lot::Mutex::new(world));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let world = Arc::clone(&world);
            thread::spawn(move || world.lock().step(1.0 / 64.0))
        })
        .collect();
    let ticks: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(ticks, 64);
    let world = world.lock();
    assert_eq!(world.vehicle_count(), ids.len());
}
