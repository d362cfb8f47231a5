use crate::core::actuator::Command;
use crate::core::beam::Beam;
use crate::core::shock::Shock;
use crate::core::trigger::{EngineTrigger, Trigger, TriggerRole, TriggerState};

/// Something a trigger asks the rest of the vehicle to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerEffect {
    Engine {
        action: EngineTrigger,
        motor: usize,
        value: f32,
    },
    Hook {
        group: i32,
        lock: bool,
    },
    CommandBlock {
        command: usize,
        blocked: bool,
    },
}

/// Steps the debounce of one trigger. Returns `Some(previous)` when the
/// effective state changed.
fn debounce(trigger: &mut Trigger, raw: TriggerState, dt: f32) -> Option<TriggerState> {
    if raw == trigger.state {
        trigger.timer = 0.0;
        return None;
    }
    trigger.timer += dt;
    if trigger.timer < trigger.hold_time {
        return None;
    }
    trigger.timer = 0.0;
    let previous = trigger.state;
    trigger.state = raw;
    Some(previous)
}

fn raw_state(trigger: &Trigger, beam: &Beam) -> (TriggerState, f32) {
    if trigger.continuous {
        trigger.continuous_value(beam.length, beam.rest_length)
    } else {
        let state = trigger.classify(beam.length, beam.rest_length);
        let value = if state == TriggerState::Inside { 0.0 } else { 1.0 };
        (state, value)
    }
}

fn active(state: TriggerState) -> bool {
    state != TriggerState::Inside
}

fn targets(trigger: &Trigger, len: usize) -> std::ops::Range<usize> {
    let start = trigger.cmd_short.min(len);
    let end = trigger.cmd_long.saturating_add(1).min(len).max(start);
    start..end
}

/// Evaluates every trigger shock of one vehicle.
///
/// Blockers run first so the triggers they gate see this tick's enable
/// state. Command triggers write `trigger_input`, which the commands read at
/// the start of the next tick.
pub fn evaluate_triggers(
    shocks: &mut [Shock],
    beams: &[Beam],
    commands: &mut [Command],
    dt: f32,
) -> Vec<TriggerEffect> {
    let mut effects = Vec::new();
    for command in commands.iter_mut() {
        command.trigger_input = 0.0;
    }

    let count = shocks.len();
    for index in 0..count {
        let beam = &beams[shocks[index].beam.index()];
        let Some(trigger) = shocks[index].trigger.as_mut() else {
            continue;
        };
        let inverted = match trigger.role {
            TriggerRole::Blocker => false,
            TriggerRole::InvertedBlocker => true,
            _ => continue,
        };
        if !trigger.enabled {
            continue;
        }
        let (raw, _) = raw_state(trigger, beam);
        debounce(trigger, raw, dt);
        let enable = active(trigger.state) == inverted;
        let range = targets(trigger, count);
        for target in range {
            if target == index {
                continue;
            }
            if let Some(t) = shocks[target].trigger.as_mut() {
                t.enabled = enable;
            }
        }
    }

    for index in 0..count {
        let beam_index = shocks[index].beam.index();
        let Some(trigger) = shocks[index].trigger.as_mut() else {
            continue;
        };
        if !trigger.enabled || matches!(trigger.role, TriggerRole::Blocker | TriggerRole::InvertedBlocker) {
            continue;
        }
        let (raw, value) = raw_state(trigger, &beams[beam_index]);
        let changed = debounce(trigger, raw, dt);
        let state = trigger.state;
        let role = trigger.role;

        match role {
            TriggerRole::Command => {
                let key = match state {
                    TriggerState::Short => Some(trigger.cmd_short),
                    TriggerState::Long => Some(trigger.cmd_long),
                    TriggerState::Inside => None,
                };
                let value = if trigger.continuous { value } else { 1.0 };
                if let Some(command) = key.and_then(|k| commands.get_mut(k)) {
                    command.trigger_input = command.trigger_input.max(value);
                }
                trigger.last_value = if key.is_some() { value } else { 0.0 };
            }
            TriggerRole::CommandBlocker => {
                if changed.is_some() {
                    let blocked = active(state);
                    let range = targets(trigger, commands.len());
                    for command in range {
                        if commands[command].trigger_block != blocked {
                            commands[command].trigger_block = blocked;
                            effects.push(TriggerEffect::CommandBlock { command, blocked });
                        }
                    }
                }
            }
            TriggerRole::HookLock | TriggerRole::HookUnlock => {
                if changed.is_some() && active(state) {
                    effects.push(TriggerEffect::Hook {
                        group: trigger.cmd_short as i32,
                        lock: role == TriggerRole::HookLock,
                    });
                }
            }
            TriggerRole::Engine(action) => {
                let value = if active(state) {
                    if trigger.continuous {
                        value
                    } else {
                        1.0
                    }
                } else {
                    0.0
                };
                if value != trigger.last_value {
                    trigger.last_value = value;
                    effects.push(TriggerEffect::Engine {
                        action,
                        motor: trigger.cmd_long,
                        value,
                    });
                }
            }
            TriggerRole::CommandSwitch => {
                if changed.is_some_and(|previous| !active(previous)) && active(state) {
                    let range = targets(trigger, count);
                    for target in range {
                        if target == index {
                            continue;
                        }
                        // Only command keys swap; ranged roles keep short <= long.
                        let command_trigger = shocks[target]
                            .trigger
                            .as_mut()
                            .filter(|t| t.role == TriggerRole::Command);
                        if let Some(t) = command_trigger {
                            std::mem::swap(&mut t.cmd_short, &mut t.cmd_long);
                        }
                    }
                }
            }
            TriggerRole::Blocker | TriggerRole::InvertedBlocker => {}
        }
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::beam::BeamId;
    use crate::core::node::NodeId;
    use crate::core::shock::ShockFlags;

    fn trigger_shock(beam: u32, trigger: Trigger) -> Shock {
        Shock::new(BeamId(beam), ShockFlags::ISTRIGGER).with_trigger(trigger)
    }

    fn beam(length: f32) -> Beam {
        let mut beam = Beam::new(NodeId(0), NodeId(1), 1.0, 0.0, 0.0);
        beam.length = length;
        beam
    }

    #[test]
    fn command_trigger_drives_short_and_long_commands() {
        let mut shocks = vec![trigger_shock(0, Trigger::new(TriggerRole::Command, 0.1, 0.1, 0, 1))];
        let mut commands = vec![Command::new("a"), Command::new("b")];
        let mut beams = vec![beam(0.8)];

        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        assert_eq!(commands[0].trigger_input, 1.0);
        assert_eq!(commands[1].trigger_input, 0.0);

        beams[0].length = 1.2;
        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        assert_eq!(commands[0].trigger_input, 0.0);
        assert_eq!(commands[1].trigger_input, 1.0);
    }

    #[test]
    fn hold_time_debounces_activation() {
        let trigger = Trigger::new(TriggerRole::HookLock, 0.1, 0.1, 2, 0).with_hold_time(0.05);
        let mut shocks = vec![trigger_shock(0, trigger)];
        let beams = vec![beam(0.5)];
        let mut fired = Vec::new();
        for _ in 0..10 {
            fired.extend(evaluate_triggers(&mut shocks, &beams, &mut [], 0.01));
        }
        assert_eq!(fired, vec![TriggerEffect::Hook { group: 2, lock: true }]);
    }

    #[test]
    fn blocker_disables_range_while_active() {
        let mut shocks = vec![
            trigger_shock(0, Trigger::new(TriggerRole::Blocker, 0.1, 0.1, 1, 1)),
            trigger_shock(1, Trigger::new(TriggerRole::Command, 0.1, 0.1, 0, 0)),
        ];
        let mut commands = vec![Command::new("a")];
        let mut beams = vec![beam(0.5), beam(0.5)];

        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        assert!(!shocks[1].trigger.as_ref().unwrap().enabled);
        assert_eq!(commands[0].trigger_input, 0.0);

        beams[0].length = 1.0;
        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        assert!(shocks[1].trigger.as_ref().unwrap().enabled);
        assert_eq!(commands[0].trigger_input, 1.0);
    }

    #[test]
    fn command_blocker_reports_changes_once() {
        let mut shocks = vec![trigger_shock(0, Trigger::new(TriggerRole::CommandBlocker, 0.1, 0.1, 0, 1))];
        let mut commands = vec![Command::new("a"), Command::new("b")];
        let mut beams = vec![beam(1.5)];
        let effects = evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        assert_eq!(effects.len(), 2);
        assert!(commands.iter().all(|c| c.trigger_block));
        assert!(evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01).is_empty());

        beams[0].length = 1.0;
        let effects = evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        assert_eq!(
            effects[0],
            TriggerEffect::CommandBlock {
                command: 0,
                blocked: false
            }
        );
    }

    #[test]
    fn continuous_engine_trigger_reports_value_changes() {
        let trigger = Trigger::new(TriggerRole::Engine(EngineTrigger::Acc), 0.5, 0.5, 0, 3).continuous();
        let mut shocks = vec![trigger_shock(0, trigger)];
        let mut beams = vec![beam(1.25)];
        let effects = evaluate_triggers(&mut shocks, &beams, &mut [], 0.01);
        assert_eq!(
            effects,
            vec![TriggerEffect::Engine {
                action: EngineTrigger::Acc,
                motor: 3,
                value: 0.5
            }]
        );
        assert!(evaluate_triggers(&mut shocks, &beams, &mut [], 0.01).is_empty());
        beams[0].length = 1.0;
        let effects = evaluate_triggers(&mut shocks, &beams, &mut [], 0.01);
        assert!(matches!(effects[0], TriggerEffect::Engine { value, .. } if value == 0.0));
    }

    #[test]
    fn command_switch_swaps_target_keys_on_activation() {
        let mut shocks = vec![
            trigger_shock(0, Trigger::new(TriggerRole::CommandSwitch, 0.1, 0.1, 1, 1)),
            trigger_shock(1, Trigger::new(TriggerRole::Command, 0.1, 0.1, 0, 1)),
        ];
        let beams = vec![beam(0.5), beam(1.0)];
        let mut commands = vec![Command::new("a"), Command::new("b")];
        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        let switched = shocks[1].trigger.as_ref().unwrap();
        assert_eq!((switched.cmd_short, switched.cmd_long), (1, 0));
    }

    #[test]
    fn command_switch_leaves_ranged_targets_alone() {
        let mut shocks = vec![
            trigger_shock(0, Trigger::new(TriggerRole::CommandSwitch, 0.1, 0.1, 1, 1)),
            trigger_shock(1, Trigger::new(TriggerRole::CommandBlocker, 0.1, 0.1, 0, 1)),
        ];
        let beams = vec![beam(0.5), beam(1.0)];
        let mut commands = vec![Command::new("a"), Command::new("b")];
        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        evaluate_triggers(&mut shocks, &beams, &mut commands, 0.01);
        let blocker = shocks[1].trigger.as_ref().unwrap();
        assert_eq!((blocker.cmd_short, blocker.cmd_long), (0, 1));
    }
}
