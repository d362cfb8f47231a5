use crate::core::node::Node;
use crate::dynamics::friction::ground_response;
use crate::dynamics::StepContext;

/// Counts from one ground contact pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContactReport {
    pub touching: usize,
    pub in_fluid: usize,
}

/// Queries the terrain for every colliding dynamic node and folds the ground
/// response into its force. Also advances node moisture.
pub fn resolve_ground_contacts(nodes: &mut [Node], ctx: &StepContext<'_>) -> ContactReport {
    let mut report = ContactReport::default();
    let gravity = ctx.gravity();
    for node in nodes.iter_mut() {
        node.contact_ground = None;
        node.contact_friction = 0.0;
        if !node.collides || node.is_static() {
            continue;
        }

        let mut in_fluid = false;
        if let Some(contact) = ctx.terrain.query(node.position) {
            if let Some(gm) = ctx.grounds.get(contact.ground) {
                let response = ground_response(node, node.forces, &contact, gm, gravity, ctx.dt);
                node.forces = response.force;
                in_fluid = response.in_fluid;
                if response.on_solid || response.in_fluid {
                    report.touching += 1;
                    node.contact_ground = Some(contact.ground);
                }
                if let Some((mu, _)) = response.friction {
                    node.contact_friction = mu;
                }
            }
        }
        if in_fluid {
            report.in_fluid += 1;
        }
        node.update_moisture(in_fluid, ctx.dt, ctx.config.drip_time);
    }
    report
}
