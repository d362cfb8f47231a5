use serde::{Deserialize, Serialize};

use crate::core::shock::ShockFlags;
use crate::error::{Result, SimError};

/// Engine action requested by an engine trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineTrigger {
    Clutch = 0,
    Brake = 1,
    Acc = 2,
    Rpm = 3,
    ShiftUp = 4,
    ShiftDown = 5,
}

impl EngineTrigger {
    pub fn from_code(code: usize) -> Option<Self> {
        match code {
            0 => Some(Self::Clutch),
            1 => Some(Self::Brake),
            2 => Some(Self::Acc),
            3 => Some(Self::Rpm),
            4 => Some(Self::ShiftUp),
            5 => Some(Self::ShiftDown),
            _ => None,
        }
    }
}

/// What a trigger does when it fires. Exactly one role per trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerRole {
    /// Drives `cmd_short` / `cmd_long` command inputs.
    Command,
    /// Disables triggers `cmd_short..=cmd_long` while active.
    Blocker,
    /// Enables triggers `cmd_short..=cmd_long` only while active.
    InvertedBlocker,
    /// Swaps the short/long commands of triggers `cmd_short..=cmd_long` on activation.
    CommandSwitch,
    /// Blocks player input on commands `cmd_short..=cmd_long` while active.
    CommandBlocker,
    /// Locks hooks of group `cmd_short` on activation.
    HookLock,
    /// Unlocks hooks of group `cmd_short` on activation.
    HookUnlock,
    /// Requests an engine action; `cmd_long` names the motor.
    Engine(EngineTrigger),
}

impl TriggerRole {
    /// Resolves a flag set into a role, rejecting ambiguous combinations.
    ///
    /// `engine_code` is only read when `TRG_ENGINE` is present. Returns the
    /// role and whether the trigger is continuous.
    pub fn from_flags(flags: ShockFlags, engine_code: usize) -> Result<(Self, bool)> {
        let sub = flags.intersection(ShockFlags::TRIGGER_ROLES);
        if !flags.contains(ShockFlags::ISTRIGGER) {
            return Err(SimError::InvalidConfig(format!(
                "trigger flags {sub:?} set on a shock without ISTRIGGER"
            )));
        }

        let continuous = sub.contains(ShockFlags::TRG_CONTINUOUS);
        let mut roles = sub;
        roles.remove(ShockFlags::TRG_CONTINUOUS);
        if roles.count() > 1 {
            return Err(SimError::InvalidConfig(format!(
                "trigger combines mutually exclusive roles {roles:?}"
            )));
        }

        let role = if roles.is_empty() {
            TriggerRole::Command
        } else if roles == ShockFlags::TRG_BLOCKER {
            TriggerRole::Blocker
        } else if roles == ShockFlags::TRG_BLOCKER_A {
            TriggerRole::InvertedBlocker
        } else if roles == ShockFlags::TRG_CMD_SWITCH {
            TriggerRole::CommandSwitch
        } else if roles == ShockFlags::TRG_CMD_BLOCKER {
            TriggerRole::CommandBlocker
        } else if roles == ShockFlags::TRG_HOOK_LOCK {
            TriggerRole::HookLock
        } else if roles == ShockFlags::TRG_HOOK_UNLOCK {
            TriggerRole::HookUnlock
        } else {
            let action = EngineTrigger::from_code(engine_code).ok_or_else(|| {
                SimError::InvalidConfig(format!("unknown engine trigger code {engine_code}"))
            })?;
            TriggerRole::Engine(action)
        };

        if continuous && !matches!(role, TriggerRole::Command | TriggerRole::Engine(_)) {
            return Err(SimError::InvalidConfig(format!(
                "TRG_CONTINUOUS cannot be combined with {role:?}"
            )));
        }

        Ok((role, continuous))
    }

    pub fn flag(self) -> ShockFlags {
        match self {
            TriggerRole::Command => ShockFlags::EMPTY,
            TriggerRole::Blocker => ShockFlags::TRG_BLOCKER,
            TriggerRole::InvertedBlocker => ShockFlags::TRG_BLOCKER_A,
            TriggerRole::CommandSwitch => ShockFlags::TRG_CMD_SWITCH,
            TriggerRole::CommandBlocker => ShockFlags::TRG_CMD_BLOCKER,
            TriggerRole::HookLock => ShockFlags::TRG_HOOK_LOCK,
            TriggerRole::HookUnlock => ShockFlags::TRG_HOOK_UNLOCK,
            TriggerRole::Engine(_) => ShockFlags::TRG_ENGINE,
        }
    }
}

/// Which side of its bounds a trigger beam currently sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerState {
    #[default]
    Inside,
    Short,
    Long,
}

/// Trigger evaluated on a shock beam each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub role: TriggerRole,
    pub continuous: bool,
    /// Fires when the beam is shorter than `rest * (1 - short_bound)`.
    pub short_bound: f32,
    /// Fires when the beam is longer than `rest * (1 + long_bound)`.
    pub long_bound: f32,
    pub cmd_short: usize,
    pub cmd_long: usize,
    /// Seconds the beam must stay beyond a bound before the trigger fires.
    pub hold_time: f32,
    /// Cleared by blocker triggers.
    pub enabled: bool,
    pub state: TriggerState,
    pub timer: f32,
    /// Last output value, used to report changes only.
    pub last_value: f32,
}

impl Trigger {
    pub fn new(role: TriggerRole, short_bound: f32, long_bound: f32, cmd_short: usize, cmd_long: usize) -> Self {
        Self {
            role,
            continuous: false,
            short_bound,
            long_bound,
            cmd_short,
            cmd_long,
            hold_time: 0.0,
            enabled: true,
            state: TriggerState::Inside,
            timer: 0.0,
            last_value: 0.0,
        }
    }

    /// Builds a trigger from definition-format flags.
    pub fn from_flags(
        flags: ShockFlags,
        engine_code: usize,
        short_bound: f32,
        long_bound: f32,
        cmd_short: usize,
        cmd_long: usize,
    ) -> Result<Self> {
        let (role, continuous) = TriggerRole::from_flags(flags, engine_code)?;
        let mut trigger = Self::new(role, short_bound, long_bound, cmd_short, cmd_long);
        trigger.continuous = continuous;
        Ok(trigger)
    }

    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    pub fn with_hold_time(mut self, hold_time: f32) -> Self {
        self.hold_time = hold_time;
        self
    }

    /// Flags equivalent to this trigger's role, for the owning shock.
    pub fn shock_flags(&self) -> ShockFlags {
        let mut flags = ShockFlags::ISTRIGGER | self.role.flag();
        flags.set(ShockFlags::TRG_CONTINUOUS, self.continuous);
        flags
    }

    /// Classifies `length` against the bounds around `rest`.
    pub fn classify(&self, length: f32, rest: f32) -> TriggerState {
        if length < rest * (1.0 - self.short_bound) {
            TriggerState::Short
        } else if length > rest * (1.0 + self.long_bound) {
            TriggerState::Long
        } else {
            TriggerState::Inside
        }
    }

    /// Proportional output for continuous triggers: 0 at rest, 1 at the bound.
    pub fn continuous_value(&self, length: f32, rest: f32) -> (TriggerState, f32) {
        let diff = length - rest;
        if diff < 0.0 {
            let span = (rest * self.short_bound).max(f32::EPSILON);
            (TriggerState::Short, (-diff / span).clamp(0.0, 1.0))
        } else {
            let span = (rest * self.long_bound).max(f32::EPSILON);
            (TriggerState::Long, (diff / span).clamp(0.0, 1.0))
        }
    }
}
