//! Angular actuators: rigidifiers hold an angle, rotators drive one.

use glam::Vec3;

use crate::core::actuator::{Rigidifier, Rotator};
use crate::core::beam::{Beam, BeamId};
use crate::core::node::Node;
use crate::utils::math::{angle_between, project_onto_plane, signed_angle_around, MIN_LENGTH};

fn beam_broken(beams: &[Beam], id: Option<BeamId>) -> bool {
    id.and_then(|id| beams.get(id.index()))
        .is_some_and(|beam| beam.broken)
}

/// Captures the rest angle of rigidifiers that were built without one.
pub fn settle_rigidifiers(rigidifiers: &mut [Rigidifier], nodes: &[Node]) {
    for r in rigidifiers {
        let pb = nodes[r.b.index()].position;
        let alpha = angle_between(nodes[r.a.index()].position - pb, nodes[r.c.index()].position - pb);
        if r.alpha < 0.0 {
            r.alpha = alpha;
        }
        r.last_alpha = alpha;
    }
}

/// Applies the restoring moment of each rigidifier.
///
/// The moment becomes a force on `a` and `c` perpendicular to their arms; `b`
/// takes the reaction so the net force is zero.
pub fn accumulate_rigidifier_forces(
    rigidifiers: &mut [Rigidifier],
    nodes: &mut [Node],
    beams: &[Beam],
    dt: f32,
) {
    for r in rigidifiers.iter_mut() {
        if beam_broken(beams, r.beam_a) || beam_broken(beams, r.beam_c) {
            continue;
        }
        let pb = nodes[r.b.index()].position;
        let arm_a = nodes[r.a.index()].position - pb;
        let arm_c = nodes[r.c.index()].position - pb;
        let (len_a, len_c) = (arm_a.length(), arm_c.length());
        if len_a < MIN_LENGTH || len_c < MIN_LENGTH {
            continue;
        }

        let alpha = angle_between(arm_a, arm_c);
        let moment = -r.k * (alpha - r.alpha) - r.d * (alpha - r.last_alpha) / dt;
        r.last_alpha = alpha;

        // Moving `a` away from `c`'s arm opens the angle.
        let open_a = -project_onto_plane(arm_c, arm_a / len_a);
        let open_c = -project_onto_plane(arm_a, arm_c / len_c);
        if open_a.length() < MIN_LENGTH || open_c.length() < MIN_LENGTH {
            continue;
        }
        let fa = open_a.normalize() * (moment / len_a);
        let fc = open_c.normalize() * (moment / len_c);

        nodes[r.a.index()].forces += fa;
        nodes[r.c.index()].forces += fc;
        nodes[r.b.index()].forces -= fa + fc;
    }
}

/// Angle of the rotating plate relative to the base plate, averaged over the
/// four node pairs.
pub fn rotator_angle(rotator: &Rotator, nodes: &[Node]) -> Option<f32> {
    let origin = nodes[rotator.axis1.index()].position;
    let axis = (nodes[rotator.axis2.index()].position - origin).try_normalize()?;
    let mut sum = 0.0;
    for k in 0..4 {
        let base = project_onto_plane(nodes[rotator.nodes1[k].index()].position - origin, axis);
        let turned = project_onto_plane(nodes[rotator.nodes2[k].index()].position - origin, axis);
        sum += signed_angle_around(axis, base, turned);
    }
    Some(sum / 4.0)
}

/// Pushes each rotating node tangentially toward the target angle, with the
/// reaction on the matching base node.
pub fn accumulate_rotator_forces(rotators: &[Rotator], nodes: &mut [Node]) {
    for rotator in rotators {
        let origin = nodes[rotator.axis1.index()].position;
        let Some(axis) = (nodes[rotator.axis2.index()].position - origin).try_normalize() else {
            continue;
        };
        for k in 0..4 {
            let (i1, i2) = (rotator.nodes1[k].index(), rotator.nodes2[k].index());
            let base = project_onto_plane(nodes[i1].position - origin, axis);
            let turned = project_onto_plane(nodes[i2].position - origin, axis);
            if base.length() < MIN_LENGTH || turned.length() < MIN_LENGTH {
                continue;
            }
            let error = wrap_angle(rotator.angle - signed_angle_around(axis, base, turned));
            if error.abs() <= rotator.tolerance {
                continue;
            }
            let tangent = axis.cross(turned).normalize_or_zero();
            let force: Vec3 = tangent * (rotator.force * error);
            nodes[i2].forces += force;
            nodes[i1].forces -= force;
        }
    }
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}
