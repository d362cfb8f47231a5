use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::ground::GroundModelId;

/// Axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

/// Point found inside a collision box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxHit {
    /// Outward normal of the nearest face, world space.
    pub normal: Vec3,
    /// Distance to that face.
    pub depth: f32,
}

/// An oriented box, stored both as absolute bounds (cheap rejection) and as
/// bounds relative to its rotation centre (exact test).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    /// Absolute bounds enclosing the rotated box.
    pub absolute: Aabb,
    /// Bounds in the box's own frame, around `center`.
    pub relative: Aabb,
    pub center: Vec3,
    pub rotation: Quat,
    pub unrotation: Quat,
    /// Extra rotation around `self_center`, applied before `rotation`.
    pub self_rotated: bool,
    pub self_center: Vec3,
    pub self_rotation: Quat,
    pub self_unrotation: Quat,
    /// Whether `absolute` has been tightened to the rotated corners.
    pub refined: bool,
    /// Event-only box; reports overlaps but never pushes nodes.
    pub virt: bool,
    pub enabled: bool,
    pub ground: Option<GroundModelId>,
    pub event_source: Option<u32>,
}

impl CollisionBox {
    /// An axis-aligned box.
    pub fn new(lo: Vec3, hi: Vec3) -> Self {
        let absolute = Aabb::new(lo, hi);
        let center = absolute.center();
        Self {
            absolute,
            relative: Aabb::new(absolute.min - center, absolute.max - center),
            center,
            rotation: Quat::IDENTITY,
            unrotation: Quat::IDENTITY,
            self_rotated: false,
            self_center: Vec3::ZERO,
            self_rotation: Quat::IDENTITY,
            self_unrotation: Quat::IDENTITY,
            refined: true,
            virt: false,
            enabled: true,
            ground: None,
            event_source: None,
        }
    }

    /// Rotates the box around `center`. The absolute bounds become a coarse
    /// envelope until [`refine`](Self::refine) is called.
    pub fn rotated(mut self, center: Vec3, rotation: Quat) -> Self {
        let shift = self.center - center;
        self.relative = Aabb::new(self.relative.min + shift, self.relative.max + shift);
        self.center = center;
        self.rotation = rotation.normalize();
        self.unrotation = self.rotation.inverse();
        let radius = self.relative.corners().iter().map(|c| c.length()).fold(0.0, f32::max);
        self.absolute = Aabb::new(center - Vec3::splat(radius), center + Vec3::splat(radius));
        self.refined = false;
        self
    }

    pub fn self_rotated(mut self, self_center: Vec3, rotation: Quat) -> Self {
        self.self_rotated = true;
        self.self_center = self_center;
        self.self_rotation = rotation.normalize();
        self.self_unrotation = self.self_rotation.inverse();
        self.refined = false;
        self
    }

    pub fn with_ground(mut self, ground: GroundModelId) -> Self {
        self.ground = Some(ground);
        self
    }

    pub fn virtual_box(mut self) -> Self {
        self.virt = true;
        self
    }

    fn to_local(&self, point: Vec3) -> Vec3 {
        let mut local = self.unrotation * (point - self.center);
        if self.self_rotated {
            local = self.self_unrotation * (local - self.self_center) + self.self_center;
        }
        local
    }

    fn to_world_dir(&self, dir: Vec3) -> Vec3 {
        let dir = if self.self_rotated {
            self.self_rotation * dir
        } else {
            dir
        };
        self.rotation * dir
    }

    /// Tightens `absolute` to the rotated corners of the box.
    pub fn refine(&mut self) {
        let corners = self.relative.corners().map(|corner| {
            let corner = if self.self_rotated {
                self.self_rotation * (corner - self.self_center) + self.self_center
            } else {
                corner
            };
            self.rotation * corner + self.center
        });
        self.absolute = Aabb::from_points(corners);
        self.refined = true;
    }

    /// Tests a world-space point against the exact box.
    pub fn hit(&self, point: Vec3) -> Option<BoxHit> {
        if !self.enabled || !self.absolute.contains(point) {
            return None;
        }
        let local = self.to_local(point);
        if !self.relative.contains(local) {
            return None;
        }

        let below = local - self.relative.min;
        let above = self.relative.max - local;
        let candidates = [
            (above.y, Vec3::Y),
            (below.y, Vec3::NEG_Y),
            (above.x, Vec3::X),
            (below.x, Vec3::NEG_X),
            (above.z, Vec3::Z),
            (below.z, Vec3::NEG_Z),
        ];
        let (depth, normal) = candidates
            .into_iter()
            .fold((f32::INFINITY, Vec3::Y), |best, candidate| {
                if candidate.0 < best.0 {
                    candidate
                } else {
                    best
                }
            });
        Some(BoxHit {
            normal: self.to_world_dir(normal),
            depth,
        })
    }
}
