use approx::assert_relative_eq;
use softrig::core::beam::CommandBinding;
use softrig::*;

/// Two nodes held 0.5 m apart, plus a force-free trigger beam of rest
/// length 1.0 between them, so the trigger reads "short" from the first tick.
fn compressed_trigger(vehicle: &mut Vehicle, trigger: Trigger) -> usize {
    let a = vehicle.add_node(Node::new(Vec3::ZERO, 10.0));
    let b = vehicle.add_node(Node::new(Vec3::new(0.5, 0.0, 0.0), 10.0));
    vehicle.add_beam(Beam::new(a, b, 0.0, 1.0e5, 100.0)).unwrap();
    let sensor = vehicle.add_beam(Beam::new(a, b, 1.0, 0.0, 0.0)).unwrap();
    vehicle
        .add_shock(Shock::new(sensor, ShockFlags::ISTRIGGER).with_trigger(trigger))
        .unwrap()
}

fn world() -> SimulationWorld {
    SimulationWorld::new(SimConfig::weightless()).unwrap()
}

#[test]
fn role_flag_without_trigger_is_rejected() {
    let mut vehicle = Vehicle::new("bad");
    let a = vehicle.add_node(Node::new(Vec3::ZERO, 1.0));
    let b = vehicle.add_node(Node::new(Vec3::X, 1.0));
    let beam = vehicle.add_beam(Beam::new(a, b, 0.0, 1.0, 0.0)).unwrap();
    let result = vehicle.add_shock(Shock::new(beam, ShockFlags::TRG_HOOK_LOCK));
    assert!(matches!(result, Err(SimError::InvalidConfig(_))));
}

#[test]
fn out_of_range_command_target_fails_validation() {
    let mut vehicle = Vehicle::new("bad");
    compressed_trigger(&mut vehicle, Trigger::new(TriggerRole::Command, 0.1, 0.1, 0, 4));
    vehicle.add_command(Command::new("only"));
    let mut world = world();
    assert!(matches!(world.spawn(vehicle), Err(SimError::OutOfRange { .. })));
}

#[test]
fn hook_lock_trigger_locks_matching_group() {
    let mut world = world();
    let mut rig = Vehicle::new("rig");
    compressed_trigger(&mut rig, Trigger::new(TriggerRole::HookLock, 0.1, 0.1, 2, 0));
    rig.add_hook(Hook::new(NodeId(1)).with_group(2).with_range(0.6, 0.5))
        .unwrap();
    rig.add_hook(Hook::new(NodeId(1)).with_group(5).with_range(0.6, 0.5))
        .unwrap();

    let mut anchor = Vehicle::new("anchor");
    anchor.add_node(Node::fixed(Vec3::new(1.0, 0.0, 0.0)));
    anchor.add_ropable(Ropable::new(NodeId(0)).multilock()).unwrap();

    let rig = world.spawn(rig).unwrap();
    world.spawn(anchor).unwrap();

    world.tick();
    let events = world.events().drain();
    assert!(events.contains(&SimEvent::HookRequest {
        vehicle: rig,
        group: 2,
        lock: true
    }));

    world.tick();
    let hooks = world.vehicle(rig).unwrap().hooks();
    assert_eq!(hooks[0].state(), LockState::PreLock);
    assert_eq!(hooks[1].state(), LockState::Unlocked);
}

#[test]
fn command_trigger_drives_command_beam() {
    let mut world = world();
    let mut rig = Vehicle::new("ram");
    compressed_trigger(&mut rig, Trigger::new(TriggerRole::Command, 0.1, 0.1, 0, 1));
    rig.add_command(Command::new("extend"));
    rig.add_command(Command::new("retract"));
    let c = rig.add_node(Node::new(Vec3::new(0.0, 2.0, 0.0), 10.0));
    let d = rig.add_node(Node::new(Vec3::new(1.0, 2.0, 0.0), 10.0));
    let ram = rig
        .add_beam(Beam::new(c, d, 0.0, 1.0e4, 100.0).with_command(CommandBinding::new(1, 0, 0.5, 1.5, 0.5)))
        .unwrap();
    let rig = world.spawn(rig).unwrap();

    for _ in 0..1000 {
        world.tick();
    }
    let vehicle = world.vehicle(rig).unwrap();
    assert_relative_eq!(vehicle.commands()[0].value, 1.0);
    assert_relative_eq!(vehicle.commands()[1].value, 0.0);
    let rest = vehicle.beam(ram).unwrap().rest_length;
    assert!(rest > 1.2 && rest <= 1.5, "rest length {rest}");
}

#[test]
fn command_blocker_masks_player_input() {
    let mut world = world();
    let mut rig = Vehicle::new("blocked");
    compressed_trigger(&mut rig, Trigger::new(TriggerRole::CommandBlocker, 0.1, 0.1, 0, 0));
    rig.add_command(Command::new("winch"));
    rig.set_command_input(0, 1.0).unwrap();
    let rig = world.spawn(rig).unwrap();

    world.tick();
    assert!(world.events().drain().contains(&SimEvent::CommandBlock {
        vehicle: rig,
        command: 0,
        blocked: true
    }));

    world.tick();
    let command = &world.vehicle(rig).unwrap().commands()[0];
    assert!(command.trigger_block);
    assert_eq!(command.value, 0.0);
}

#[test]
fn engine_trigger_reports_action_once() {
    let mut world = world();
    let mut rig = Vehicle::new("pedal");
    compressed_trigger(
        &mut rig,
        Trigger::new(TriggerRole::Engine(EngineTrigger::Brake), 0.1, 0.1, 0, 1),
    );
    let rig = world.spawn(rig).unwrap();

    for _ in 0..20 {
        world.tick();
    }
    let actions: Vec<_> = world
        .events()
        .drain()
        .into_iter()
        .filter(|e| matches!(e, SimEvent::EngineAction { .. }))
        .collect();
    assert_eq!(
        actions,
        vec![SimEvent::EngineAction {
            vehicle: rig,
            action: EngineTrigger::Brake,
            motor: 1,
            value: 1.0
        }]
    );
}
