use glam::Vec3;

use crate::collision::boxes::CollisionBox;
use crate::core::ground::GroundModelId;

/// Contact reported by the terrain for a single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Surface normal, pointing out of the ground.
    pub normal: Vec3,
    /// Depth below the surface; for fluid grounds, below the fluid surface.
    pub penetration: f32,
    pub ground: GroundModelId,
}

/// Collision collaborator queried for every colliding node and wheel rim
/// node each tick. Shared read-only between worker threads.
pub trait TerrainQuery: Send + Sync {
    fn query(&self, position: Vec3) -> Option<GroundContact>;
}

/// Empty world: nothing is ever touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerrain;

impl TerrainQuery for NoTerrain {
    fn query(&self, _position: Vec3) -> Option<GroundContact> {
        None
    }
}

/// Infinite horizontal plane.
#[derive(Debug, Clone, Copy)]
pub struct FlatGround {
    pub height: f32,
    pub ground: GroundModelId,
}

impl FlatGround {
    pub fn new(height: f32, ground: GroundModelId) -> Self {
        Self { height, ground }
    }
}

impl TerrainQuery for FlatGround {
    fn query(&self, position: Vec3) -> Option<GroundContact> {
        let penetration = self.height - position.y;
        (penetration > 0.0).then_some(GroundContact {
            normal: Vec3::Y,
            penetration,
            ground: self.ground,
        })
    }
}

/// A ground plane plus static collision boxes. Boxes take precedence over the
/// plane; virtual boxes are ignored.
#[derive(Debug, Clone)]
pub struct BoxTerrain {
    pub plane: Option<FlatGround>,
    pub boxes: Vec<CollisionBox>,
    /// Model used for boxes that carry none.
    pub default_ground: GroundModelId,
}

impl BoxTerrain {
    pub fn new(plane: Option<FlatGround>, default_ground: GroundModelId) -> Self {
        Self {
            plane,
            boxes: Vec::new(),
            default_ground,
        }
    }

    pub fn with_box(mut self, mut collision_box: CollisionBox) -> Self {
        if !collision_box.refined {
            collision_box.refine();
        }
        self.boxes.push(collision_box);
        self
    }

    /// Boxes whose exact volume contains `position`, including virtual ones.
    pub fn overlapping(&self, position: Vec3) -> impl Iterator<Item = (usize, &CollisionBox)> + '_ {
        self.boxes
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.hit(position).is_some())
    }
}

impl TerrainQuery for BoxTerrain {
    fn query(&self, position: Vec3) -> Option<GroundContact> {
        let from_box = self
            .boxes
            .iter()
            .filter(|b| !b.virt)
            .filter_map(|b| b.hit(position).map(|hit| (b, hit)))
            .min_by(|(_, a), (_, b)| a.depth.total_cmp(&b.depth))
            .map(|(b, hit)| GroundContact {
                normal: hit.normal,
                penetration: hit.depth,
                ground: b.ground.unwrap_or(self.default_ground),
            });
        from_box.or_else(|| self.plane.as_ref().and_then(|plane| plane.query(position)))
    }
}
