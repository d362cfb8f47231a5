//! Core data model: nodes, beams, shocks, wheels, actuators, props and ground models.

pub mod actuator;
pub mod beam;
pub mod ground;
pub mod node;
pub mod prop;
pub mod shock;
pub mod store;
pub mod trigger;
pub mod wheel;

pub use actuator::{Command, Rigidifier, Rotator};
pub use beam::{Beam, BeamId, BeamKind, Bounded, CommandBinding, HydroFlags};
pub use ground::{GroundModel, GroundModelId, GroundModelRegistry};
pub use node::{Moisture, Node, NodeId, NodeRef};
pub use prop::{AnimChannel, AnimChannels, AnimFlags, AnimMode, AnimationInputs, Prop, PropPose};
pub use shock::{Shock, ShockFlags};
pub use store::NodeBeamStore;
pub use trigger::{EngineTrigger, Trigger, TriggerRole, TriggerState};
pub use wheel::{Propulsion, Wheel, WheelType};
