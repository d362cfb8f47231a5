use crate::config::HYDRO_SPEED_LIMIT;
use crate::core::actuator::{Command, Rotator};
use crate::core::beam::{Beam, HydroFlags};

/// Control inputs read by hydros this tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HydroInputs {
    pub steering: f32,
    pub aileron: f32,
    pub rudder: f32,
    pub elevator: f32,
    /// Vehicle speed (m/s), attenuates speed-sensitive steering.
    pub speed: f32,
}

/// Control state of a hydro for the given inputs, clamped to `[-1, 1]`.
pub fn hydro_state(flags: HydroFlags, inputs: &HydroInputs) -> f32 {
    let mut state = 0.0;
    if flags.contains(HydroFlags::DIR) {
        state += inputs.steering;
    }
    if flags.contains(HydroFlags::SPEED) && inputs.speed.abs() < HYDRO_SPEED_LIMIT {
        state += inputs.steering * (HYDRO_SPEED_LIMIT - inputs.speed.abs()) / HYDRO_SPEED_LIMIT;
    }
    if flags.contains(HydroFlags::AILERON) {
        state += inputs.aileron;
    }
    if flags.contains(HydroFlags::REV_AILERON) {
        state -= inputs.aileron;
    }
    if flags.contains(HydroFlags::RUDDER) {
        state += inputs.rudder;
    }
    if flags.contains(HydroFlags::REV_RUDDER) {
        state -= inputs.rudder;
    }
    if flags.contains(HydroFlags::ELEVATOR) {
        state += inputs.elevator;
    }
    if flags.contains(HydroFlags::REV_ELEVATOR) {
        state -= inputs.elevator;
    }
    state.clamp(-1.0, 1.0)
}

/// Moves hydro rest lengths: `L = L_hydro * (1 - state * ratio)`.
pub fn update_hydros(beams: &mut [Beam], inputs: &HydroInputs) {
    for beam in beams.iter_mut() {
        if !beam.kind.is_hydro() || beam.hydro_flags.is_empty() || beam.broken {
            continue;
        }
        let state = hydro_state(beam.hydro_flags, inputs);
        beam.rest_length = beam.hydro_length * (1.0 - state * beam.hydro_ratio);
    }
}

/// Refreshes every command's value from its player and trigger inputs.
pub fn update_commands(commands: &mut [Command]) {
    for command in commands.iter_mut() {
        command.update();
    }
}

fn command_value(commands: &[Command], key: usize) -> f32 {
    commands.get(key).map_or(0.0, |c| c.value)
}

/// Extends or shortens command beams between their ratio bounds.
pub fn update_command_beams(beams: &mut [Beam], commands: &[Command], engine_running: bool, dt: f32) {
    for beam in beams.iter_mut() {
        let Some(binding) = beam.command else {
            continue;
        };
        if beam.broken || (binding.needs_engine && !engine_running) {
            continue;
        }
        let drive = command_value(commands, binding.long_key) - command_value(commands, binding.short_key);
        if drive == 0.0 {
            continue;
        }
        let rate = if engine_running {
            binding.rate * binding.engine_coupling
        } else {
            binding.rate
        };
        beam.command_ratio = (beam.command_ratio + drive * rate * dt)
            .clamp(binding.short_ratio, binding.long_ratio);
        beam.rest_length = beam.ref_length * beam.command_ratio;
    }
}

/// Advances rotator target angles from the commands bound to them.
pub fn update_rotator_targets(rotators: &mut [Rotator], commands: &[Command], engine_running: bool, dt: f32) {
    for command in commands {
        if command.value == 0.0 {
            continue;
        }
        for &(index, direction) in &command.rotators {
            let Some(rotator) = rotators.get_mut(index) else {
                continue;
            };
            if rotator.needs_engine && !engine_running {
                continue;
            }
            let coupling = if engine_running { rotator.engine_coupling } else { 1.0 };
            rotator.angle += rotator.rate * command.value * direction * coupling * dt;
        }
    }
}
