//! Props: visual attachments posed from three reference nodes.
//!
//! Props are outputs only. They read node positions after integration and
//! never write back into the simulation.

use glam::{EulerRot, Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::node::{Node, NodeId};
use crate::error::{Result, SimError};
use crate::utils::math::MIN_LENGTH;

/// Animation channels a prop can carry.
pub const MAX_ANIM_CHANNELS: usize = 10;
/// Beacon lights a prop can carry.
pub const MAX_BEACONS: usize = 4;

crate::flag_set! {
    /// Source values an animation channel follows.
    pub struct AnimFlags: u32 {
        const AIRSPEED = 1 << 0;
        const VVI = 1 << 1;
        const ALTIMETER = 1 << 2;
        const AOA = 1 << 3;
        const FLAP = 1 << 4;
        const AIRBRAKE = 1 << 5;
        const ROLL = 1 << 6;
        const PITCH = 1 << 7;
        const THROTTLE = 1 << 8;
        const RPM = 1 << 9;
        const ACCEL = 1 << 10;
        const BRAKE = 1 << 11;
        const CLUTCH = 1 << 12;
        const TACHO = 1 << 13;
        const SPEEDO = 1 << 14;
        const PBRAKE = 1 << 15;
        const TURBO = 1 << 16;
        const SHIFTER = 1 << 17;
        const AETORQUE = 1 << 18;
        const AEPITCH = 1 << 19;
        const AESTATUS = 1 << 20;
        const TORQUE = 1 << 21;
        const HEADING = 1 << 22;
        const DIFFLOCK = 1 << 23;
        const STEERING = 1 << 24;
        const EVENT = 1 << 25;
        const AILERONS = 1 << 26;
        const ARUDDER = 1 << 27;
        const BRUDDER = 1 << 28;
        const BTHROTTLE = 1 << 29;
        const PERMANENT = 1 << 30;
        const ELEVATORS = 1 << 31;
    }
}

crate::flag_set! {
    /// How an animation channel moves its prop.
    pub struct AnimMode: u32 {
        const ROTA_X = 1 << 0;
        const ROTA_Y = 1 << 1;
        const ROTA_Z = 1 << 2;
        const OFFSET_X = 1 << 3;
        const OFFSET_Y = 1 << 4;
        const OFFSET_Z = 1 << 5;
        const AUTOANIMATE = 1 << 6;
        const NOFLIP = 1 << 7;
        const BOUNCE = 1 << 8;
    }
}

/// Source values for prop animation, one slot per [`AnimFlags`] bit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationInputs {
    pub values: [f32; 32],
}

impl Default for AnimationInputs {
    fn default() -> Self {
        Self { values: [0.0; 32] }
    }
}

impl AnimationInputs {
    /// Sets the value of every source named in `source`.
    pub fn set(&mut self, source: AnimFlags, value: f32) {
        for bit in 0..32 {
            if source.bits() & (1 << bit) != 0 {
                self.values[bit] = value;
            }
        }
    }

    pub fn get(&self, source: AnimFlags) -> f32 {
        self.sum(source)
    }

    /// Sum of every source named in `sources`.
    pub fn sum(&self, sources: AnimFlags) -> f32 {
        (0..32)
            .filter(|bit| sources.bits() & (1 << bit) != 0)
            .map(|bit| self.values[bit])
            .sum()
    }
}

/// One animation channel of a prop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimChannel {
    /// Degrees (rotation modes) or metres (offset modes) per unit of source value.
    pub ratio: f32,
    pub flags: AnimFlags,
    pub mode: AnimMode,
    pub lower_limit: f32,
    pub upper_limit: f32,
    /// Accumulated value for auto-animated channels.
    pub state: f32,
    /// Direction of travel for bouncing channels.
    pub direction: f32,
}

impl AnimChannel {
    pub fn new(flags: AnimFlags, mode: AnimMode, ratio: f32) -> Self {
        Self {
            ratio,
            flags,
            mode,
            lower_limit: 0.0,
            upper_limit: 0.0,
            state: 0.0,
            direction: 1.0,
        }
    }

    pub fn with_limits(mut self, lower: f32, upper: f32) -> Self {
        self.lower_limit = lower;
        self.upper_limit = upper;
        self
    }

    fn limited(&self) -> bool {
        self.upper_limit > self.lower_limit
    }

    /// Advances the channel and returns its current displacement.
    pub fn evaluate(&mut self, inputs: &AnimationInputs, dt: f32) -> f32 {
        let source = inputs.sum(self.flags) * self.ratio;
        if !self.mode.contains(AnimMode::AUTOANIMATE) {
            self.state = if self.limited() {
                source.clamp(self.lower_limit, self.upper_limit)
            } else {
                source
            };
            return self.state;
        }

        self.state += source * dt * self.direction;
        if self.limited() {
            if self.mode.contains(AnimMode::BOUNCE) {
                if self.state > self.upper_limit {
                    self.state = self.upper_limit;
                    self.direction = -1.0;
                } else if self.state < self.lower_limit {
                    self.state = self.lower_limit;
                    self.direction = 1.0;
                }
            } else if self.mode.contains(AnimMode::NOFLIP) {
                self.state = self.state.clamp(self.lower_limit, self.upper_limit);
            } else {
                let span = self.upper_limit - self.lower_limit;
                self.state = self.lower_limit + (self.state - self.lower_limit).rem_euclid(span);
            }
        } else if self.mode.intersects(
            AnimMode::ROTA_X.with(AnimMode::ROTA_Y).with(AnimMode::ROTA_Z),
        ) {
            self.state = self.state.rem_euclid(360.0);
        }
        self.state
    }
}

/// Fixed-capacity, index-addressable list of animation channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimChannels {
    channels: Vec<AnimChannel>,
}

impl AnimChannels {
    pub fn push(&mut self, channel: AnimChannel) -> Result<usize> {
        if self.channels.len() >= MAX_ANIM_CHANNELS {
            return Err(SimError::out_of_range(
                "animation channel",
                self.channels.len(),
                MAX_ANIM_CHANNELS,
            ));
        }
        self.channels.push(channel);
        Ok(self.channels.len() - 1)
    }

    pub fn get(&self, index: usize) -> Result<&AnimChannel> {
        let len = self.channels.len();
        self.channels
            .get(index)
            .ok_or(SimError::out_of_range("animation channel", index, len))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut AnimChannel> {
        let len = self.channels.len();
        self.channels
            .get_mut(index)
            .ok_or(SimError::out_of_range("animation channel", index, len))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimChannel> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AnimChannel> {
        self.channels.iter_mut()
    }
}

/// A rotating beacon flare.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeaconLight {
    /// Radians per second.
    pub rotation_rate: f32,
    /// Radians.
    pub rotation_angle: f32,
}

/// World-space pose of a prop for the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for PropPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prop {
    pub node_ref: NodeId,
    pub node_x: NodeId,
    pub node_y: NodeId,
    /// Offset in the reference frame: x/y as fractions of the ref->x and
    /// ref->y edges, z in metres along their normal.
    pub offset: Vec3,
    pub rotation: Quat,
    pub anim: AnimChannels,
    beacons: Vec<BeaconLight>,
    #[serde(skip)]
    pub pose: PropPose,
}

impl Prop {
    pub fn new(node_ref: NodeId, node_x: NodeId, node_y: NodeId) -> Self {
        Self {
            node_ref,
            node_x,
            node_y,
            offset: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            anim: AnimChannels::default(),
            beacons: Vec::new(),
            pose: PropPose::default(),
        }
    }

    pub fn with_offset(mut self, offset: Vec3, rotation: Quat) -> Self {
        self.offset = offset;
        self.rotation = rotation;
        self
    }

    pub fn add_beacon(&mut self, rotation_rate: f32) -> Result<usize> {
        if self.beacons.len() >= MAX_BEACONS {
            return Err(SimError::out_of_range("beacon", self.beacons.len(), MAX_BEACONS));
        }
        self.beacons.push(BeaconLight {
            rotation_rate,
            rotation_angle: 0.0,
        });
        Ok(self.beacons.len() - 1)
    }

    pub fn beacons(&self) -> &[BeaconLight] {
        &self.beacons
    }

    pub fn node_ids(&self) -> [NodeId; 3] {
        [self.node_ref, self.node_x, self.node_y]
    }

    /// Recomputes the pose from the reference nodes and animation inputs.
    pub fn update(&mut self, nodes: &[Node], inputs: &AnimationInputs, dt: f32) -> PropPose {
        let origin = nodes[self.node_ref.index()].position;
        let edge_x = nodes[self.node_x.index()].position - origin;
        let edge_y = nodes[self.node_y.index()].position - origin;
        let normal = edge_x.cross(edge_y).normalize_or_zero();

        let mut offset = self.offset;
        let mut euler = Vec3::ZERO;
        for channel in self.anim.iter_mut() {
            let value = channel.evaluate(inputs, dt);
            let mode = channel.mode;
            if mode.contains(AnimMode::ROTA_X) {
                euler.x += value;
            }
            if mode.contains(AnimMode::ROTA_Y) {
                euler.y += value;
            }
            if mode.contains(AnimMode::ROTA_Z) {
                euler.z += value;
            }
            if mode.contains(AnimMode::OFFSET_X) {
                offset.x += value;
            }
            if mode.contains(AnimMode::OFFSET_Y) {
                offset.y += value;
            }
            if mode.contains(AnimMode::OFFSET_Z) {
                offset.z += value;
            }
        }

        for beacon in &mut self.beacons {
            beacon.rotation_angle =
                (beacon.rotation_angle + beacon.rotation_rate * dt).rem_euclid(std::f32::consts::TAU);
        }

        let position = origin + edge_x * offset.x + edge_y * offset.y + normal * offset.z;
        let frame = if edge_x.length() > MIN_LENGTH && normal != Vec3::ZERO {
            let x_axis = edge_x.normalize();
            let z_axis = normal;
            let y_axis = z_axis.cross(x_axis);
            Quat::from_mat3(&Mat3::from_cols(x_axis, y_axis, z_axis))
        } else {
            Quat::IDENTITY
        };
        let animated = Quat::from_euler(
            EulerRot::XYZ,
            euler.x.to_radians(),
            euler.y.to_radians(),
            euler.z.to_radians(),
        );

        self.pose = PropPose {
            position,
            rotation: frame * self.rotation * animated,
        };
        self.pose
    }
}
