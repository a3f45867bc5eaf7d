//! Authoritative bed identity and status.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::{Bed, BedFilter, BedStatus, CreateBedRequest, CreateRoomRequest, Room};
use crate::audit::{AuditEvent, AuditHandle};
use crate::clock::Clock;
use crate::error::{EntityKind, Result, TurnoverError};
use crate::store::{BedWrite, FacilityStore};

/// Holds bed status and occupant, and is the only place bed writes are built.
///
/// Mutating calls assume the caller holds the bed's lock; the versioned
/// write catches anyone who does not.
pub struct BedRegistry {
    store: Arc<dyn FacilityStore>,
    clock: Arc<dyn Clock>,
    audit: Option<AuditHandle>,
}

impl BedRegistry {
    pub fn new(
        store: Arc<dyn FacilityStore>,
        clock: Arc<dyn Clock>,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    pub fn provision_room(&self, request: CreateRoomRequest) -> Result<Room> {
        let room_number = request.room_number.trim();
        let department = request.department.trim();
        if room_number.is_empty() {
            return Err(TurnoverError::Validation("room_number is required".into()));
        }
        if department.is_empty() {
            return Err(TurnoverError::Validation("department is required".into()));
        }

        let room = Room {
            id: Uuid::new_v4().to_string(),
            room_number: room_number.to_string(),
            department: department.to_string(),
            floor: request.floor,
            created_at: self.clock.now(),
        };
        self.store.create_room(&room)?;

        info!(room_id = %room.id, room_number = %room.room_number, "Room provisioned");
        self.emit(AuditEvent::RoomProvisioned {
            room_id: room.id.clone(),
            room_number: room.room_number.clone(),
            department: room.department.clone(),
        });
        Ok(room)
    }

    pub fn get_room(&self, room_id: &str) -> Result<Room> {
        self.store
            .get_room(room_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::Room, room_id))
    }

    pub fn list_rooms(&self) -> Result<Vec<Room>> {
        self.store.list_rooms()
    }

    /// Create a bed in `available`. The caller triggers assignment.
    pub fn provision_bed(&self, request: CreateBedRequest) -> Result<Bed> {
        let bed_number = request.bed_number.trim();
        if bed_number.is_empty() {
            return Err(TurnoverError::Validation("bed_number is required".into()));
        }
        let room = self.get_room(&request.room_id)?;

        let now = self.clock.now();
        let bed = Bed {
            id: Uuid::new_v4().to_string(),
            bed_number: bed_number.to_string(),
            room_id: room.id.clone(),
            room_number: room.room_number.clone(),
            department: room.department.clone(),
            bed_type: request.bed_type,
            isolation_capable: request.isolation_capable,
            status: BedStatus::Available,
            patient_id: None,
            admission_date: None,
            discharge_date: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_bed(&bed)?;

        info!(bed_id = %bed.id, room = %room.room_number, bed_number = %bed.bed_number, "Bed provisioned");
        self.emit(AuditEvent::BedProvisioned {
            bed_id: bed.id.clone(),
            room_id: room.id,
            bed_number: bed.bed_number.clone(),
            bed_type: bed.bed_type.to_string(),
        });
        Ok(bed)
    }

    pub fn get(&self, bed_id: &str) -> Result<Bed> {
        self.store
            .get_bed(bed_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::Bed, bed_id))
    }

    pub fn list(&self, filter: &BedFilter) -> Result<Vec<Bed>> {
        self.store.list_beds(filter)
    }

    /// Administrative status change.
    ///
    /// Only `available`, `reserved` and `maintenance` are accepted targets, and
    /// beds that are `occupied` or `cleaning` must leave those states through
    /// discharge or the turnover.
    pub fn set_status(&self, bed_id: &str, new_status: BedStatus) -> Result<Bed> {
        let bed = self.get(bed_id)?;
        if !new_status.is_admin_target()
            || matches!(bed.status, BedStatus::Occupied | BedStatus::Cleaning)
        {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Bed,
                bed_id,
                bed.status,
                format!("set status to {} on", new_status),
            ));
        }

        let write = self.prepare_transition(&bed, new_status)?;
        let updated = self.store.write_bed(&write)?;

        info!(bed_id, from = %bed.status, to = %new_status, "Bed status changed");
        self.emit(AuditEvent::BedStatusChanged {
            bed_id: bed_id.to_string(),
            from_status: bed.status.to_string(),
            to_status: new_status.to_string(),
        });
        Ok(updated)
    }

    /// Put `patient_id` into an available bed directly (no queue entry).
    ///
    /// Fails with `ConflictingAssignment` if another writer changed the bed
    /// first, or the patient already occupies a bed.
    pub fn assign_patient(&self, bed_id: &str, patient_id: &str) -> Result<Bed> {
        let bed = self.get(bed_id)?;
        let write = self.prepare_assignment(&bed, patient_id)?;
        let updated = self.store.write_bed(&write)?;
        debug!(bed_id, patient_id, "Patient placed in bed");
        Ok(updated)
    }

    /// Write that releases an occupied bed into `cleaning`.
    pub fn prepare_release(&self, bed: &Bed) -> Result<BedWrite> {
        if bed.status != BedStatus::Occupied {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Bed,
                &bed.id,
                bed.status,
                "release",
            ));
        }
        let now = self.clock.now();
        Ok(BedWrite {
            bed_id: bed.id.clone(),
            expected_version: bed.version,
            status: BedStatus::Cleaning,
            patient_id: None,
            admission_date: bed.admission_date,
            discharge_date: Some(now),
            updated_at: now,
        })
    }

    /// Write that occupies an available bed with `patient_id`.
    pub fn prepare_assignment(&self, bed: &Bed, patient_id: &str) -> Result<BedWrite> {
        if bed.status != BedStatus::Available {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Bed,
                &bed.id,
                bed.status,
                "assign patient to",
            ));
        }
        if patient_id.trim().is_empty() {
            return Err(TurnoverError::Validation("patient_id is required".into()));
        }
        let now = self.clock.now();
        Ok(BedWrite {
            bed_id: bed.id.clone(),
            expected_version: bed.version,
            status: BedStatus::Occupied,
            patient_id: Some(patient_id.to_string()),
            admission_date: Some(now),
            discharge_date: None,
            updated_at: now,
        })
    }

    /// Write for any other transition in the table; the bed ends up empty.
    pub fn prepare_transition(&self, bed: &Bed, next: BedStatus) -> Result<BedWrite> {
        if next == BedStatus::Occupied || !bed.status.can_transition_to(next) {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Bed,
                &bed.id,
                bed.status,
                format!("move to {}", next),
            ));
        }
        Ok(BedWrite {
            bed_id: bed.id.clone(),
            expected_version: bed.version,
            status: next,
            patient_id: None,
            admission_date: bed.admission_date,
            discharge_date: bed.discharge_date,
            updated_at: self.clock.now(),
        })
    }
}
