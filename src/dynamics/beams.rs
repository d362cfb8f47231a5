use glam::Vec3;

use crate::config::SimConfig;
use crate::core::beam::{Beam, BeamId, Bounded};
use crate::core::node::Node;
use crate::core::shock::{Shock, ShockFlags};
use crate::utils::math::MIN_LENGTH;

/// Result of evaluating one spring-damper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringDamper {
    /// Unit vector from `b` to `a`.
    pub direction: Vec3,
    pub length: f32,
    /// Signed force along `direction`; positive pushes the nodes apart.
    pub stress: f32,
}

impl SpringDamper {
    /// Force on node `a`; node `b` receives the negation.
    #[inline]
    pub fn force(&self) -> Vec3 {
        self.direction * self.stress
    }
}

/// `stress = -k (len - rest) - d v_rel` along the beam.
#[inline]
pub fn spring_damper(k: f32, d: f32, rest: f32, pa: Vec3, pb: Vec3, va: Vec3, vb: Vec3) -> SpringDamper {
    let delta = pa - pb;
    let length = delta.length();
    if length < MIN_LENGTH {
        return SpringDamper {
            direction: Vec3::ZERO,
            length,
            stress: 0.0,
        };
    }
    let direction = delta / length;
    let closing = (va - vb).dot(direction);
    SpringDamper {
        direction,
        length,
        stress: -k * (length - rest) - d * closing,
    }
}

/// Spring and damping of `beam` at `diff` metres from rest, after applying its
/// bounded behaviour.
pub fn effective_rates(
    beam: &Beam,
    shock: Option<&Shock>,
    diff: f32,
    closing: f32,
    config: &SimConfig,
) -> (f32, f32) {
    let (mut k, mut d) = (beam.k, beam.d);
    let rest = beam.rest_length;
    match beam.bounded {
        Bounded::NoShock => {}
        Bounded::Shock1 | Bounded::Shock2 => {
            if beam.bounded == Bounded::Shock2 {
                if let Some(shock) = shock {
                    (k, d) = shock.shock2_rates(diff, closing, rest);
                }
            }
            let long = beam.long_bound * rest;
            let short = beam.short_bound * rest;
            let excess = if diff > long {
                diff - long
            } else if diff < -short {
                -short - diff
            } else {
                0.0
            };
            if excess > 0.0 {
                let (bump_k, bump_d) = match shock {
                    Some(shock) if shock.flags.contains(ShockFlags::SOFTBUMP) => {
                        (shock.bump_spring, shock.bump_damp)
                    }
                    _ => (config.bump_spring, config.bump_damp),
                };
                let interp = excess.min(1.0);
                k += (bump_k - k) * interp;
                d += (bump_d - d) * interp;
            }
        }
        Bounded::SupportBeam => {
            if diff > 0.0 {
                k = 0.0;
                d *= 0.1;
            }
        }
        Bounded::Rope => {
            if diff < 0.0 {
                k = 0.0;
                d *= 0.1;
            }
        }
    }
    (k, d)
}

/// Evaluates a beam between two node states without deformation or breakage.
pub fn evaluate_beam(
    beam: &Beam,
    shock: Option<&Shock>,
    a: (Vec3, Vec3),
    b: (Vec3, Vec3),
    config: &SimConfig,
) -> SpringDamper {
    let delta = a.0 - b.0;
    let length = delta.length();
    if length < MIN_LENGTH {
        return SpringDamper {
            direction: Vec3::ZERO,
            length,
            stress: 0.0,
        };
    }
    let direction = delta / length;
    let closing = (a.1 - b.1).dot(direction);
    let (k, d) = effective_rates(beam, shock, length - beam.rest_length, closing, config);
    spring_damper(k, d, beam.rest_length, a.0, b.0, a.1, b.1)
}

/// What happened to beams during a force pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BeamReport {
    pub broken: Vec<BeamId>,
    /// Non-default detacher groups touched by a breaking beam.
    pub detached_groups: Vec<u32>,
}

impl BeamReport {
    pub fn is_empty(&self) -> bool {
        self.broken.is_empty()
    }
}

/// Shifts the rest length of an overstressed beam and returns the capped stress.
fn plastic_deform(beam: &mut Beam, stress: f32, k: f32) -> f32 {
    let magnitude = stress.abs();
    if k <= 0.0 || magnitude <= beam.deform {
        return stress;
    }
    let over = magnitude - beam.deform;
    let sign = stress.signum();
    beam.rest_length -= sign * over * (1.0 - beam.plastic_coef) / k;
    sign * (beam.deform + over * beam.plastic_coef)
}

/// Accumulates forces of every active, non-coupling beam of one vehicle.
///
/// Each beam adds `+F` to its first node and `-F` to its second, so the pass
/// never adds net momentum. Trigger beams are measured but apply no force.
pub fn accumulate_beam_forces(
    nodes: &mut [Node],
    beams: &mut [Beam],
    shocks: &[Shock],
    config: &SimConfig,
) -> BeamReport {
    let mut report = BeamReport::default();
    for (index, beam) in beams.iter_mut().enumerate() {
        if !beam.is_active() || beam.remote.is_some() {
            continue;
        }
        let (ia, ib) = (beam.node_a.index(), beam.node_b.index());
        let (pa, va) = (nodes[ia].position, nodes[ia].velocity);
        let (pb, vb) = (nodes[ib].position, nodes[ib].velocity);
        let shock = beam.shock.and_then(|s| shocks.get(s));

        if shock.is_some_and(Shock::is_trigger) {
            beam.length = pa.distance(pb);
            beam.stress = 0.0;
            continue;
        }

        let delta = pa - pb;
        let length = delta.length();
        beam.length = length;
        if length < MIN_LENGTH {
            beam.stress = 0.0;
            continue;
        }
        let direction = delta / length;
        let diff = length - beam.rest_length;
        let closing = (va - vb).dot(direction);
        let (k, d) = effective_rates(beam, shock, diff, closing, config);
        let mut stress = -k * diff - d * closing;

        if beam.bounded == Bounded::NoShock {
            stress = plastic_deform(beam, stress, k);
        }

        let snapped = stress.abs() > beam.strength
            || (beam.bounded == Bounded::SupportBeam
                && diff > beam.rest_length * config.support_beam_limit);
        if snapped {
            beam.broken = true;
            beam.disabled = true;
            beam.stress = 0.0;
            report.broken.push(BeamId::from(index));
            if beam.detacher_group > 0 && !report.detached_groups.contains(&beam.detacher_group) {
                report.detached_groups.push(beam.detacher_group);
            }
            continue;
        }

        beam.stress = stress;
        let force = direction * stress * beam.force_scale;
        nodes[ia].forces += force;
        nodes[ib].forces -= force;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::NodeId;
    use approx::assert_relative_eq;

    fn nodes(separation: f32) -> Vec<Node> {
        vec![
            Node::new(Vec3::ZERO, 1.0),
            Node::new(Vec3::new(separation, 0.0, 0.0), 1.0),
        ]
    }

    #[test]
    fn stretched_beam_pulls_nodes_together() {
        let mut nodes = nodes(1.2);
        let mut beams = vec![Beam::new(NodeId(0), NodeId(1), 1.0, 1000.0, 10.0)];
        accumulate_beam_forces(&mut nodes, &mut beams, &[], &SimConfig::default());

        assert_relative_eq!(nodes[0].forces.x, 200.0, epsilon = 1e-3);
        assert_relative_eq!(nodes[1].forces.x, -200.0, epsilon = 1e-3);
        assert_eq!(nodes[0].forces + nodes[1].forces, Vec3::ZERO);
        assert_relative_eq!(beams[0].stress, -200.0, epsilon = 1e-3);
    }

    #[test]
    fn rope_is_slack_in_compression() {
        let mut nodes = nodes(0.5);
        let mut beams = vec![Beam::new(NodeId(0), NodeId(1), 1.0, 1000.0, 0.0)
            .with_bounds(Bounded::Rope, 0.0, 0.0)];
        accumulate_beam_forces(&mut nodes, &mut beams, &[], &SimConfig::default());
        assert_eq!(nodes[0].forces, Vec3::ZERO);
    }

    #[test]
    fn support_beam_is_slack_in_tension_and_breaks_past_limit() {
        let config = SimConfig::default();
        let mut near = nodes(1.5);
        let mut beams = vec![Beam::new(NodeId(0), NodeId(1), 1.0, 1000.0, 0.0)
            .with_bounds(Bounded::SupportBeam, 0.0, 0.0)];
        accumulate_beam_forces(&mut near, &mut beams, &[], &config);
        assert_eq!(near[0].forces, Vec3::ZERO);
        assert!(!beams[0].broken);

        let mut far = nodes(6.0);
        let report = accumulate_beam_forces(&mut far, &mut beams, &[], &config);
        assert_eq!(report.broken, vec![BeamId(0)]);
        assert!(beams[0].broken && beams[0].disabled);
    }

    #[test]
    fn overstressed_beam_deforms_then_breaks() {
        let config = SimConfig::default();
        let mut n = nodes(0.9);
        let mut beams = vec![Beam::new(NodeId(0), NodeId(1), 1.0, 1000.0, 0.0)
            .with_deform(50.0, 0.0)
            .with_strength(500.0)
            .with_detacher_group(3)];
        accumulate_beam_forces(&mut n, &mut beams, &[], &config);
        assert_relative_eq!(beams[0].stress, 50.0, epsilon = 1e-3);
        assert_relative_eq!(beams[0].rest_length, 0.95, epsilon = 1e-4);

        let mut strong = vec![Beam::new(NodeId(0), NodeId(1), 1.0, 1000.0, 0.0)
            .with_deform(1.0e6, 0.0)
            .with_strength(50.0)
            .with_detacher_group(3)];
        let report = accumulate_beam_forces(&mut n, &mut strong, &[], &config);
        assert_eq!(report.detached_groups, vec![3]);
    }

    #[test]
    fn shock1_stiffens_beyond_bounds() {
        let mut config = SimConfig::default();
        config.bump_spring = 5000.0;
        config.bump_damp = 0.0;
        let beam = Beam::new(NodeId(0), NodeId(1), 1.0, 100.0, 0.0)
            .with_bounds(Bounded::Shock1, 0.1, 0.1);
        assert_eq!(effective_rates(&beam, None, 0.05, 0.0, &config), (100.0, 0.0));
        let (k, _) = effective_rates(&beam, None, 0.3, 0.0, &config);
        assert!(k > 100.0 && k <= 5000.0);
    }
}
