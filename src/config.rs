//! Engine constants and the runtime [`SimConfig`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Default gravity vector applied to every node (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Fixed physics timestep (2 kHz).
pub const DEFAULT_TIME_STEP: f32 = 0.0005;

/// Upper bound on ticks run by a single `step` call before time is dropped.
pub const DEFAULT_MAX_TICKS_PER_STEP: u32 = 200;

/// Spring rate used for beams that do not specify one.
pub const DEFAULT_SPRING: f32 = 9_000_000.0;

/// Damping used for beams that do not specify one.
pub const DEFAULT_DAMP: f32 = 12_000.0;

/// Break force of a beam that does not specify one.
pub const DEFAULT_BEAM_STRENGTH: f32 = 1_000_000.0;

/// Stress above which a beam starts to deform plastically.
pub const DEFAULT_BEAM_DEFORM: f32 = 400_000.0;

/// Support beams break when stretched beyond this multiple of their length.
pub const SUPPORT_BEAM_LIMIT_DEFAULT: f32 = 4.0;

/// Wheel speed (m/s) above which speed-sensitive hydros stop steering.
pub const HYDRO_SPEED_LIMIT: f32 = 12.0;

/// Seconds a node keeps dripping after it leaves a fluid.
pub const DRIP_TIME: f32 = 5.0;

pub const HOOK_RANGE_DEFAULT: f32 = 0.4;
pub const HOOK_SPEED_DEFAULT: f32 = 0.5;
pub const HOOK_FORCE_DEFAULT: f32 = 10_000_000.0;
pub const HOOK_LOCKED_LENGTH: f32 = 0.05;
pub const ROPE_RANGE_DEFAULT: f32 = 1.0;
pub const TIE_RANGE_DEFAULT: f32 = 2.0;
pub const TIE_SPEED_DEFAULT: f32 = 1.0;
pub const TIE_MIN_LENGTH: f32 = 0.1;
pub const TIE_MAX_STRESS_DEFAULT: f32 = 100_000.0;

/// Seconds over which a coupling's force is ramped down while unlocking.
pub const UNLOCK_RAMP_TIME: f32 = 0.25;

/// Runtime settings shared by every vehicle of a world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub time_step: f32,
    pub gravity: Vec3,
    pub max_ticks_per_step: u32,
    /// Spring applied by Shock1 beams beyond their bounds.
    pub bump_spring: f32,
    pub bump_damp: f32,
    pub support_beam_limit: f32,
    pub hook_locked_length: f32,
    pub tie_speed: f32,
    pub tie_min_length: f32,
    pub unlock_ramp_time: f32,
    pub drip_time: f32,
    /// Nodes faster than this are clamped.
    pub max_node_speed: f32,
    /// Nodes further than this from the origin are treated as unstable.
    pub max_position: f32,
    pub frame_budget_ms: f32,
    pub parallel: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            max_ticks_per_step: DEFAULT_MAX_TICKS_PER_STEP,
            bump_spring: DEFAULT_SPRING,
            bump_damp: DEFAULT_DAMP,
            support_beam_limit: SUPPORT_BEAM_LIMIT_DEFAULT,
            hook_locked_length: HOOK_LOCKED_LENGTH,
            tie_speed: TIE_SPEED_DEFAULT,
            tie_min_length: TIE_MIN_LENGTH,
            unlock_ramp_time: UNLOCK_RAMP_TIME,
            drip_time: DRIP_TIME,
            max_node_speed: 1_000.0,
            max_position: 1.0e6,
            frame_budget_ms: 16.0,
            parallel: false,
        }
    }
}

impl SimConfig {
    /// Gravity-free settings, handy for isolated beam experiments.
    pub fn weightless() -> Self {
        Self {
            gravity: Vec3::ZERO,
            ..Self::default()
        }
    }

    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        if self.max_ticks_per_step == 0 {
            return Err(SimError::InvalidConfig(
                "max_ticks_per_step must be at least 1".into(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(SimError::InvalidConfig("gravity must be finite".into()));
        }
        if self.unlock_ramp_time <= 0.0 || self.tie_speed < 0.0 || self.tie_min_length < 0.0 {
            return Err(SimError::InvalidConfig(
                "coupling timings must be non-negative (unlock ramp > 0)".into(),
            ));
        }
        if self.max_node_speed <= 0.0 || self.max_position <= 0.0 {
            return Err(SimError::InvalidConfig(
                "numeric limits must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_timestep_is_rejected() {
        let config = SimConfig::default().with_time_step(0.0);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "time_step": 0.001 }"#).unwrap();
        assert_eq!(config.time_step, 0.001);
        assert_eq!(config.drip_time, DRIP_TIME);
    }
}
