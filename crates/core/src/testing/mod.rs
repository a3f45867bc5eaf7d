//! Testing utilities: a controllable clock and request fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use bedflow_core::testing::{fixtures, ManualClock};
//!
//! let (service, clock) = fixtures::service();
//! let room = service.provision_room(fixtures::room("204", "Cardiology"))?;
//! let bed = service.provision_bed(fixtures::bed(&room.id, "A")).await?;
//!
//! clock.advance_minutes(10);
//! ```

mod manual_clock;

pub use manual_clock::ManualClock;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use super::ManualClock;
    use crate::bed::{BedType, CreateBedRequest, CreateRoomRequest};
    use crate::equipment::{CreateEquipmentRequest, StartCleaningRequest};
    use crate::queue::{EnqueueRequest, QueueConfig, QueueCriteria};
    use crate::service::TurnoverService;
    use crate::store::SqliteFacilityStore;
    use crate::turnover::{StartTurnoverRequest, TurnoverConfig};

    /// Service over an in-memory store with a manual clock and no audit.
    pub fn service() -> (TurnoverService, Arc<ManualClock>) {
        service_with(TurnoverConfig::default(), QueueConfig::default())
    }

    pub fn service_with(
        turnover: TurnoverConfig,
        queue: QueueConfig,
    ) -> (TurnoverService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = SqliteFacilityStore::in_memory()
            .unwrap_or_else(|e| panic!("in-memory store: {}", e));
        let service = TurnoverService::new(Arc::new(store), turnover, queue, clock.clone(), None);
        (service, clock)
    }

    pub fn room(room_number: &str, department: &str) -> CreateRoomRequest {
        CreateRoomRequest {
            room_number: room_number.to_string(),
            department: department.to_string(),
            floor: None,
        }
    }

    /// A standard, non-isolation bed.
    pub fn bed(room_id: &str, bed_number: &str) -> CreateBedRequest {
        CreateBedRequest {
            room_id: room_id.to_string(),
            bed_number: bed_number.to_string(),
            bed_type: BedType::Standard,
            isolation_capable: false,
        }
    }

    pub fn typed_bed(
        room_id: &str,
        bed_number: &str,
        bed_type: BedType,
        isolation_capable: bool,
    ) -> CreateBedRequest {
        CreateBedRequest {
            bed_type,
            isolation_capable,
            ..bed(room_id, bed_number)
        }
    }

    pub fn patient(patient_id: &str, priority: i32, department: &str) -> EnqueueRequest {
        EnqueueRequest {
            patient_id: patient_id.to_string(),
            priority,
            criteria: QueueCriteria::for_department(department),
            notes: None,
        }
    }

    pub fn patient_with(patient_id: &str, priority: i32, criteria: QueueCriteria) -> EnqueueRequest {
        EnqueueRequest {
            patient_id: patient_id.to_string(),
            priority,
            criteria,
            notes: None,
        }
    }

    pub fn equipment(name: &str, room_id: Option<&str>) -> CreateEquipmentRequest {
        CreateEquipmentRequest {
            name: name.to_string(),
            equipment_type: "monitor".to_string(),
            room_id: room_id.map(str::to_string),
        }
    }

    pub fn turnover(minutes: u32) -> StartTurnoverRequest {
        StartTurnoverRequest {
            estimated_duration_minutes: Some(minutes),
            ..Default::default()
        }
    }

    pub fn cleaning(minutes: u32) -> StartCleaningRequest {
        StartCleaningRequest {
            estimated_duration_minutes: Some(minutes),
            ..Default::default()
        }
    }
}
