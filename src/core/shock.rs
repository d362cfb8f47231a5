use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_DAMP, DEFAULT_SPRING};
use crate::core::beam::BeamId;
use crate::core::trigger::Trigger;

crate::flag_set! {
    /// Behaviour flags of a shock beam.
    pub struct ShockFlags: u32 {
        const NORMAL = 1 << 0;
        const INVISIBLE = 1 << 1;
        const LACTIVE = 1 << 2;
        const RACTIVE = 1 << 3;
        const ISSHOCK2 = 1 << 4;
        const SOFTBUMP = 1 << 5;
        const ISTRIGGER = 1 << 6;
        const TRG_BLOCKER = 1 << 7;
        const TRG_CMD_SWITCH = 1 << 8;
        const TRG_CMD_BLOCKER = 1 << 9;
        const TRG_BLOCKER_A = 1 << 10;
        const TRG_HOOK_UNLOCK = 1 << 11;
        const TRG_HOOK_LOCK = 1 << 12;
        const TRG_CONTINUOUS = 1 << 13;
        const TRG_ENGINE = 1 << 14;
    }
}

impl ShockFlags {
    /// Every trigger sub-flag (excluding `ISTRIGGER` itself).
    pub const TRIGGER_ROLES: Self = Self::TRG_BLOCKER
        .with(Self::TRG_CMD_SWITCH)
        .with(Self::TRG_CMD_BLOCKER)
        .with(Self::TRG_BLOCKER_A)
        .with(Self::TRG_HOOK_UNLOCK)
        .with(Self::TRG_HOOK_LOCK)
        .with(Self::TRG_CONTINUOUS)
        .with(Self::TRG_ENGINE);
}

/// Runtime state attached to a bounded beam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shock {
    pub beam: BeamId,
    pub flags: ShockFlags,
    pub spring_in: f32,
    pub damp_in: f32,
    /// Progressive spring factor while compressing.
    pub prog_spring_in: f32,
    pub prog_damp_in: f32,
    pub spring_out: f32,
    pub damp_out: f32,
    pub prog_spring_out: f32,
    pub prog_damp_out: f32,
    /// Bump-stop rates used beyond the bounds.
    pub bump_spring: f32,
    pub bump_damp: f32,
    /// Present when the beam also acts as a trigger source.
    pub trigger: Option<Trigger>,
}

impl Shock {
    pub fn new(beam: BeamId, flags: ShockFlags) -> Self {
        Self {
            beam,
            flags,
            spring_in: 0.0,
            damp_in: 0.0,
            prog_spring_in: 0.0,
            prog_damp_in: 0.0,
            spring_out: 0.0,
            damp_out: 0.0,
            prog_spring_out: 0.0,
            prog_damp_out: 0.0,
            bump_spring: DEFAULT_SPRING,
            bump_damp: DEFAULT_DAMP,
            trigger: None,
        }
    }

    /// Shock2 rates: compression `(spring, damp, progressive spring, progressive damp)`
    /// and the matching rebound set.
    pub fn with_rates(mut self, compress: [f32; 4], rebound: [f32; 4]) -> Self {
        [self.spring_in, self.damp_in, self.prog_spring_in, self.prog_damp_in] = compress;
        [self.spring_out, self.damp_out, self.prog_spring_out, self.prog_damp_out] = rebound;
        self
    }

    pub fn with_bump(mut self, spring: f32, damp: f32) -> Self {
        self.bump_spring = spring;
        self.bump_damp = damp;
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.flags.insert(ShockFlags::ISTRIGGER);
        self.trigger = Some(trigger);
        self
    }

    pub fn is_trigger(&self) -> bool {
        self.flags.contains(ShockFlags::ISTRIGGER)
    }

    /// Spring and damping for a Shock2 beam at `diff` metres from rest while
    /// moving at `velocity` along the beam.
    pub fn shock2_rates(&self, diff: f32, velocity: f32, rest_length: f32) -> (f32, f32) {
        let travel = if rest_length > f32::EPSILON {
            diff.abs() / rest_length
        } else {
            0.0
        };
        if diff < 0.0 {
            (
                self.spring_in + self.prog_spring_in * travel * self.spring_in,
                self.damp_in + self.prog_damp_in * velocity.abs() * self.damp_in,
            )
        } else {
            (
                self.spring_out + self.prog_spring_out * travel * self.spring_out,
                self.damp_out + self.prog_damp_out * velocity.abs() * self.damp_out,
            )
        }
    }
}
