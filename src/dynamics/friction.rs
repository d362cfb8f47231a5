use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::terrain::GroundContact;
use crate::core::ground::GroundModel;
use crate::core::node::Node;
use crate::utils::math::pow_non_negative;

/// Which friction law produced a coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrictionRegime {
    /// Slip below the adhesion velocity.
    Static,
    /// Stribeck curve plus hydrodynamic term.
    Sliding,
}

/// Hydrodynamic friction is capped at this contribution.
const MAX_HYDRODYNAMIC_FRICTION: f32 = 5.0;

/// Stribeck/adhesion friction coefficient for a tangential slip speed.
///
/// Below the adhesion velocity `va` the static coefficient `ms` applies. Above
/// it the coefficient decays from `ms` toward `mc` with the Stribeck velocity
/// `vs`, plus `t2 * slip` for lubricated surfaces.
pub fn friction_coefficient(gm: &GroundModel, slip: f32) -> (f32, FrictionRegime) {
    if slip < gm.va {
        return (gm.ms, FrictionRegime::Static);
    }
    (stribeck(gm, slip), FrictionRegime::Sliding)
}

fn stribeck(gm: &GroundModel, slip: f32) -> f32 {
    let decay = (-pow_non_negative(slip / gm.vs, gm.alpha)).exp();
    gm.mc + (gm.ms - gm.mc) * decay + (gm.t2 * slip).min(MAX_HYDRODYNAMIC_FRICTION)
}

/// Outcome of resolving one node against the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundResponse {
    /// Total force on the node after contact, replacing the input force.
    pub force: Vec3,
    /// Coefficient applied, when the node rests on solid ground.
    pub friction: Option<(f32, FrictionRegime)>,
    pub in_fluid: bool,
    pub on_solid: bool,
}

/// Resolves a node touching `gm` at `contact`.
///
/// `force` is the force accumulated on the node so far this tick (gravity
/// included). Fluid grounds add power-law drag and buoyancy above the solid
/// level; at or below it the normal reaction is computed from the steady force
/// plus an impact term and tangential friction is applied.
pub fn ground_response(
    node: &Node,
    force: Vec3,
    contact: &GroundContact,
    gm: &GroundModel,
    gravity: f32,
    dt: f32,
) -> GroundResponse {
    let normal = contact.normal;
    let penetration = contact.penetration;
    let velocity = node.velocity;
    let vn = velocity.dot(normal);
    let mut force = force;
    let fn_steady = force.dot(normal);
    let mut response = GroundResponse {
        force,
        friction: None,
        in_fluid: false,
        on_solid: false,
    };

    if gm.has_fluid() && penetration >= 0.0 {
        response.in_fluid = true;
        let v_squared = velocity.length_squared();
        let m = gm.flow_consistency_index
            * pow_non_negative(v_squared, (gm.flow_behavior_index - 1.0) * 0.5);
        let mut drag = velocity * (-m * node.surface_coef);
        if gm.drag_anisotropy < 1.0 && vn > 0.0 {
            let va_squared = gm.va * gm.va;
            let factor = if v_squared > va_squared {
                1.0
            } else {
                v_squared / va_squared
            };
            drag += normal * (vn * m * (1.0 - gm.drag_anisotropy) * factor);
        }
        force += drag;

        let mut buoyancy = gm.fluid_density * penetration * gravity * node.volume_coef;
        if gm.flow_behavior_index < 1.0 && vn >= 0.0 && fn_steady < 0.0 && buoyancy > -fn_steady {
            buoyancy = -fn_steady;
        }
        force += normal * buoyancy;
    }

    if penetration >= gm.solid_ground_level {
        response.on_solid = true;
        let mut reaction = -fn_steady;
        if vn < 0.0 {
            let depth = gm.solid_ground_level - penetration;
            reaction -= (0.8 * vn + 0.2 * depth / dt) * node.mass() / dt;
        }
        if reaction > 0.0 {
            let tangential_force = force - normal * force.dot(normal);
            let slip_velocity = velocity - normal * vn;
            let slip = slip_velocity.length();
            let slip_dir = if slip > f32::EPSILON {
                slip_velocity / slip
            } else {
                Vec3::ZERO
            };
            let g_reaction = reaction * gm.strength * node.friction_coef;
            let ms_reaction = gm.ms * g_reaction;

            if slip < gm.va && g_reaction > 0.0 && tangential_force.length_squared() <= ms_reaction * ms_reaction {
                let ff = -ms_reaction * (1.0 - (-slip / gm.va).exp());
                force += normal * reaction + slip_dir * ff - tangential_force;
                response.friction = Some((gm.ms, FrictionRegime::Static));
            } else {
                let g = stribeck(gm, slip);
                force += normal * reaction - slip_dir * (g * g_reaction);
                response.friction = Some((g, FrictionRegime::Sliding));
            }
        }
    }

    response.force = force;
    response
}
