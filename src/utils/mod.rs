//! Utility helpers including math extensions, the vehicle arena, flag sets, and logging.

pub mod allocator;
pub mod flags;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{Arena, GenerationalId, VehicleId};
pub use math::*;
