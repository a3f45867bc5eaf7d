//! Equipment items and their cleaning cycles.
//!
//! Tracked independently of beds; room readiness reads both.

mod registry;
mod tracker;
mod types;

pub use registry::EquipmentRegistry;
pub use tracker::{EquipmentTransition, EquipmentTurnoverTracker};
pub use types::{
    CreateEquipmentRequest, Equipment, EquipmentFilter, EquipmentStatus, EquipmentTurnover,
    StartCleaningRequest,
};
