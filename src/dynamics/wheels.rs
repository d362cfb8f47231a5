use glam::Vec3;

use crate::core::node::Node;
use crate::core::wheel::Wheel;
use crate::utils::math::{project_onto_plane, MIN_LENGTH};

/// Rim speed (m/s) below which brake torque is scaled down to avoid chatter.
const BRAKE_FADE_SPEED: f32 = 1.0;

/// Drive and brake torque requested for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct WheelTorques {
    pub drive: f32,
    pub brake: f32,
}

fn axle(wheel: &Wheel, nodes: &[Node]) -> Option<(Vec3, Vec3)> {
    let near = nodes[wheel.axle_near.index()].position;
    let far = nodes[wheel.axle_far.index()].position;
    Some((near, (far - near).try_normalize()?))
}

/// Applies drive and brake torque as tangential rim forces, reacting equally
/// on the two axle nodes.
pub fn apply_wheel_torques(wheels: &[Wheel], nodes: &mut [Node], torques: WheelTorques) {
    for wheel in wheels {
        if wheel.nodes.is_empty() {
            continue;
        }
        let mut torque = torques.drive * wheel.propulsion.sign();
        if wheel.braked && torques.brake > 0.0 {
            let fade = (wheel.speed() / BRAKE_FADE_SPEED).clamp(-1.0, 1.0);
            torque -= torques.brake * fade;
        }
        if torque == 0.0 {
            continue;
        }
        let Some((origin, axis)) = axle(wheel, nodes) else {
            continue;
        };

        let share = torque / wheel.nodes.len() as f32;
        let mut reaction = Vec3::ZERO;
        for rim in &wheel.nodes {
            let radial = project_onto_plane(nodes[rim.index()].position - origin, axis);
            let radius = radial.length();
            if radius < MIN_LENGTH {
                continue;
            }
            let force = axis.cross(radial / radius) * (share / radius);
            nodes[rim.index()].forces += force;
            reaction -= force;
        }
        nodes[wheel.axle_near.index()].forces += reaction * 0.5;
        nodes[wheel.axle_far.index()].forces += reaction * 0.5;
    }
}

/// Refreshes angular speed and ground contact of each wheel from its nodes.
pub fn update_wheel_state(wheels: &mut [Wheel], nodes: &[Node]) {
    for wheel in wheels.iter_mut() {
        let Some((origin, axis)) = axle(wheel, nodes) else {
            wheel.angular_speed = 0.0;
            continue;
        };
        let hub_velocity = (nodes[wheel.axle_near.index()].velocity
            + nodes[wheel.axle_far.index()].velocity)
            * 0.5;

        let mut omega = 0.0;
        let mut counted = 0;
        let mut contacts = 0;
        let mut friction = 0.0;
        wheel.ground = None;
        for rim in &wheel.nodes {
            let node = &nodes[rim.index()];
            let radial = project_onto_plane(node.position - origin, axis);
            let radius = radial.length();
            if radius >= MIN_LENGTH {
                let tangent = axis.cross(radial / radius);
                omega += (node.velocity - hub_velocity).dot(tangent) / radius;
                counted += 1;
            }
            if let Some(ground) = node.contact_ground {
                contacts += 1;
                friction += node.contact_friction;
                wheel.ground.get_or_insert(ground);
            }
        }
        wheel.angular_speed = if counted > 0 { omega / counted as f32 } else { 0.0 };
        wheel.contact_count = contacts;
        wheel.friction = if contacts > 0 { friction / contacts as f32 } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::NodeId;
    use crate::core::wheel::Propulsion;
    use approx::assert_relative_eq;

    fn wheel_nodes() -> (Vec<Node>, Wheel) {
        let mut nodes = vec![
            Node::new(Vec3::new(0.0, 0.0, -0.1), 1.0),
            Node::new(Vec3::new(0.0, 0.0, 0.1), 1.0),
        ];
        let mut rim = Vec::new();
        for i in 0..8 {
            let a = i as f32 * std::f32::consts::TAU / 8.0;
            nodes.push(Node::new(Vec3::new(a.cos() * 0.5, a.sin() * 0.5, 0.0), 1.0));
            rim.push(NodeId(i + 2));
        }
        let wheel = Wheel::new(rim, NodeId(0), NodeId(1), 0.5).propelled(Propulsion::Forward).braked();
        (nodes, wheel)
    }

    #[test]
    fn drive_torque_has_no_net_force() {
        let (mut nodes, wheel) = wheel_nodes();
        apply_wheel_torques(
            &[wheel],
            &mut nodes,
            WheelTorques {
                drive: 100.0,
                brake: 0.0,
            },
        );
        let net = nodes.iter().fold(Vec3::ZERO, |sum, n| sum + n.forces);
        assert_relative_eq!(net.length(), 0.0, epsilon = 1e-3);
        let torque: f32 = nodes[2..]
            .iter()
            .map(|n| n.position.cross(n.forces).z)
            .sum();
        assert_relative_eq!(torque, 100.0, epsilon = 1e-2);
    }

    #[test]
    fn spinning_rim_reports_angular_speed() {
        let (mut nodes, mut wheel) = wheel_nodes();
        for node in nodes[2..].iter_mut() {
            node.velocity = Vec3::Z.cross(node.position) * 4.0;
        }
        update_wheel_state(std::slice::from_mut(&mut wheel), &nodes);
        assert_relative_eq!(wheel.angular_speed, 4.0, epsilon = 1e-4);
        assert_relative_eq!(wheel.speed(), 2.0, epsilon = 1e-4);
        assert!(!wheel.in_contact());
    }

    #[test]
    fn brake_opposes_rotation() {
        let (mut nodes, mut wheel) = wheel_nodes();
        wheel.angular_speed = 10.0;
        apply_wheel_torques(
            &[wheel],
            &mut nodes,
            WheelTorques {
                drive: 0.0,
                brake: 50.0,
            },
        );
        let torque: f32 = nodes[2..]
            .iter()
            .map(|n| n.position.cross(n.forces).z)
            .sum();
        assert_relative_eq!(torque, -50.0, epsilon = 1e-2);
    }
}
