//! Discrete signals leaving the simulation core.
//!
//! Vehicles collect their events in a private outbox during a tick; the world
//! forwards them to the configured [`EventSink`] in vehicle order once every
//! vehicle has finished, so the sink sees a deterministic sequence even when
//! vehicles were stepped on worker threads.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::beam::BeamId;
use crate::core::node::NodeId;
use crate::core::trigger::EngineTrigger;
use crate::coupling::{CouplingKind, LockState};
use crate::utils::allocator::VehicleId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// An engine trigger fired; `motor` is the trigger's long command slot.
    EngineAction {
        vehicle: VehicleId,
        action: EngineTrigger,
        motor: usize,
        value: f32,
    },
    /// A hook trigger asked for the hooks of `group` to lock or unlock.
    HookRequest {
        vehicle: VehicleId,
        group: i32,
        lock: bool,
    },
    /// A command blocker trigger changed a command's key block.
    CommandBlock {
        vehicle: VehicleId,
        command: usize,
        blocked: bool,
    },
    BeamBroken {
        vehicle: VehicleId,
        beam: BeamId,
    },
    DetacherGroupDisabled {
        vehicle: VehicleId,
        group: u32,
        beams: usize,
    },
    CouplingChanged {
        vehicle: VehicleId,
        kind: CouplingKind,
        index: usize,
        state: LockState,
    },
    /// A node went non-finite or out of bounds and was frozen in place.
    NumericInstability {
        vehicle: VehicleId,
        node: NodeId,
    },
}

impl SimEvent {
    pub fn vehicle(&self) -> VehicleId {
        match self {
            SimEvent::EngineAction { vehicle, .. }
            | SimEvent::HookRequest { vehicle, .. }
            | SimEvent::CommandBlock { vehicle, .. }
            | SimEvent::BeamBroken { vehicle, .. }
            | SimEvent::DetacherGroupDisabled { vehicle, .. }
            | SimEvent::CouplingChanged { vehicle, .. }
            | SimEvent::NumericInstability { vehicle, .. } => *vehicle,
        }
    }
}

/// Receiver of simulation events. Called from the thread running `step`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SimEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SimEvent) {}
}

/// Buffers events until a consumer drains them.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<Vec<SimEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<SimEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventQueue {
    fn emit(&self, event: SimEvent) {
        self.events.lock().push(event);
    }
}
