//! Beds, rooms and the bed status machine.

mod registry;
mod types;

pub use registry::BedRegistry;
pub use types::{
    Bed, BedFilter, BedStatus, BedType, CreateBedRequest, CreateRoomRequest, Room,
};
