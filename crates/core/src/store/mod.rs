//! Facility storage: rooms, beds, equipment, turnovers and the patient queue.
//!
//! Every method that touches more than one relation runs as a single
//! transaction in the implementation. Bed and equipment writes are
//! versioned: a write whose `expected_version` no longer matches fails with
//! [`TurnoverError::ConflictingAssignment`](crate::TurnoverError).

mod sqlite;

pub use sqlite::SqliteFacilityStore;

use chrono::{DateTime, Utc};

use crate::bed::{Bed, BedFilter, BedStatus, Room};
use crate::equipment::{Equipment, EquipmentFilter, EquipmentStatus, EquipmentTurnover};
use crate::error::Result;
use crate::queue::{PatientQueueEntry, QueueFilter};
use crate::turnover::{BedTurnover, TurnoverFilter, TurnoverStatus};

/// Full replacement of a bed's mutable columns, guarded by its version.
#[derive(Debug, Clone, PartialEq)]
pub struct BedWrite {
    pub bed_id: String,
    pub expected_version: i64,
    pub status: BedStatus,
    pub patient_id: Option<String>,
    pub admission_date: Option<DateTime<Utc>>,
    pub discharge_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Status change for an equipment item, guarded by its version.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentWrite {
    pub equipment_id: String,
    pub expected_version: i64,
    pub status: EquipmentStatus,
    pub updated_at: DateTime<Utc>,
}

/// Moves an active turnover to `completed` or `cancelled`.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnoverClose {
    pub turnover_id: String,
    pub status: TurnoverStatus,
    pub at: DateTime<Utc>,
    pub cancel_reason: Option<String>,
}

/// Storage backend for the facility state.
pub trait FacilityStore: Send + Sync {
    // Rooms

    fn create_room(&self, room: &Room) -> Result<()>;

    fn get_room(&self, id: &str) -> Result<Option<Room>>;

    fn list_rooms(&self) -> Result<Vec<Room>>;

    // Beds

    /// Insert a new bed. `room_number`/`department` on `bed` are ignored.
    fn insert_bed(&self, bed: &Bed) -> Result<()>;

    fn get_bed(&self, id: &str) -> Result<Option<Bed>>;

    fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>>;

    fn count_beds_by_status(&self) -> Result<Vec<(BedStatus, i64)>>;

    /// Apply a versioned bed write and return the updated bed.
    fn write_bed(&self, write: &BedWrite) -> Result<Bed>;

    /// Release the bed and insert its turnover record in one transaction.
    fn begin_bed_turnover(&self, release: &BedWrite, turnover: &BedTurnover) -> Result<Bed>;

    /// Close the active turnover and update the bed in one transaction.
    fn close_bed_turnover(
        &self,
        close: &TurnoverClose,
        bed: &BedWrite,
    ) -> Result<(Bed, BedTurnover)>;

    fn active_bed_turnover(&self, bed_id: &str) -> Result<Option<BedTurnover>>;

    fn list_bed_turnovers(&self, filter: &TurnoverFilter) -> Result<Vec<BedTurnover>>;

    // Equipment

    fn insert_equipment(&self, equipment: &Equipment) -> Result<()>;

    fn get_equipment(&self, id: &str) -> Result<Option<Equipment>>;

    fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>>;

    fn write_equipment(&self, write: &EquipmentWrite) -> Result<Equipment>;

    fn begin_equipment_turnover(
        &self,
        release: &EquipmentWrite,
        turnover: &EquipmentTurnover,
    ) -> Result<Equipment>;

    fn close_equipment_turnover(
        &self,
        close: &TurnoverClose,
        equipment: &EquipmentWrite,
    ) -> Result<(Equipment, EquipmentTurnover)>;

    fn active_equipment_turnover(&self, equipment_id: &str) -> Result<Option<EquipmentTurnover>>;

    fn list_equipment_turnovers(&self, filter: &TurnoverFilter) -> Result<Vec<EquipmentTurnover>>;

    // Queue

    /// Insert a waiting entry. A second waiting entry for the same patient
    /// fails with `Validation`.
    fn insert_queue_entry(&self, entry: &PatientQueueEntry) -> Result<()>;

    fn get_queue_entry(&self, id: &str) -> Result<Option<PatientQueueEntry>>;

    fn list_queue_entries(&self, filter: &QueueFilter) -> Result<Vec<PatientQueueEntry>>;

    fn count_queue_entries(&self, filter: &QueueFilter) -> Result<i64>;

    /// All waiting entries, unordered.
    fn waiting_queue_entries(&self) -> Result<Vec<PatientQueueEntry>>;

    /// Cancel a waiting entry. Returns false if it was no longer waiting.
    fn cancel_queue_entry(
        &self,
        id: &str,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Mark `entry_id` assigned and apply the occupying bed write in one
    /// transaction. Fails with `ConflictingAssignment` if the entry is no
    /// longer waiting or the bed version moved.
    fn assign_from_queue(
        &self,
        bed: &BedWrite,
        entry_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(Bed, PatientQueueEntry)>;
}
