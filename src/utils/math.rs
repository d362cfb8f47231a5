//! Additional math helpers layered on top of `glam`.

use glam::Vec3;

/// Lengths below this are treated as coincident points.
pub const MIN_LENGTH: f32 = 1e-6;

/// Moves `current` toward `target` by at most `max_delta`.
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if current < target {
        (current + max_delta).min(target)
    } else {
        (current - max_delta).max(target)
    }
}

/// Removes the component of `v` along the unit vector `normal`.
pub fn project_onto_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Signed angle from `from` to `to` measured around `axis` (right-handed).
pub fn signed_angle_around(axis: Vec3, from: Vec3, to: Vec3) -> f32 {
    let cross = from.cross(to);
    cross.dot(axis).atan2(from.dot(to))
}

/// Unsigned angle between two vectors, robust near 0 and π.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    a.cross(b).length().atan2(a.dot(b))
}

/// Fast `x^y` for the non-negative bases used by the fluid drag model.
pub fn pow_non_negative(base: f32, exponent: f32) -> f32 {
    if base <= 0.0 {
        if exponent == 0.0 { 1.0 } else { 0.0 }
    } else {
        base.powf(exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn signed_angle_follows_right_hand_rule() {
        let angle = signed_angle_around(Vec3::Z, Vec3::X, Vec3::Y);
        assert!((angle - FRAC_PI_2).abs() < 1e-6);
        let angle = signed_angle_around(Vec3::Z, Vec3::Y, Vec3::X);
        assert!((angle + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn approach_never_overshoots() {
        assert_eq!(approach(0.0, 1.0, 0.3), 0.3);
        assert_eq!(approach(0.9, 1.0, 0.3), 1.0);
        assert_eq!(approach(1.0, 0.0, 2.0), 0.0);
    }
}
