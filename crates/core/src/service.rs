//! Operations exposed to the API layer.
//!
//! [`TurnoverService`] wires the registry, trackers, queue and coordinator
//! over one store and one set of bed locks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::assignment::{Assignment, AssignmentCoordinator};
use crate::audit::{AuditHandle, CompletedBy};
use crate::bed::{
    Bed, BedFilter, BedRegistry, BedStatus, CreateBedRequest, CreateRoomRequest, Room,
};
use crate::clock::Clock;
use crate::equipment::{
    CreateEquipmentRequest, Equipment, EquipmentFilter, EquipmentRegistry, EquipmentStatus,
    EquipmentTransition, EquipmentTurnover, EquipmentTurnoverTracker, StartCleaningRequest,
};
use crate::error::Result;
use crate::locks::KeyedLocks;
use crate::queue::{EnqueueRequest, PatientQueue, PatientQueueEntry, QueueConfig, QueueFilter};
use crate::readiness::{room_readiness, RoomReadiness};
use crate::store::FacilityStore;
use crate::turnover::{
    BedStatusReport, BedTurnover, CompletionOutcome, EquipmentStatusReport, StartTurnoverRequest,
    TurnoverConfig, TurnoverTracker, TurnoverTransition,
};

pub struct TurnoverService {
    store: Arc<dyn FacilityStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<KeyedLocks>,
    beds: Arc<BedRegistry>,
    queue: Arc<PatientQueue>,
    coordinator: Arc<AssignmentCoordinator>,
    turnovers: TurnoverTracker,
    equipment: Arc<EquipmentRegistry>,
    equipment_turnovers: EquipmentTurnoverTracker,
}

impl TurnoverService {
    pub fn new(
        store: Arc<dyn FacilityStore>,
        turnover_config: TurnoverConfig,
        queue_config: QueueConfig,
        clock: Arc<dyn Clock>,
        audit: Option<AuditHandle>,
    ) -> Self {
        let locks = Arc::new(KeyedLocks::new());
        let beds = Arc::new(BedRegistry::new(
            store.clone(),
            clock.clone(),
            audit.clone(),
        ));
        let queue = Arc::new(PatientQueue::new(
            store.clone(),
            clock.clone(),
            queue_config,
            audit.clone(),
        ));
        let coordinator = Arc::new(AssignmentCoordinator::new(
            store.clone(),
            beds.clone(),
            queue.clone(),
            locks.clone(),
            audit.clone(),
        ));
        let turnovers = TurnoverTracker::new(
            store.clone(),
            beds.clone(),
            coordinator.clone(),
            locks.clone(),
            clock.clone(),
            turnover_config.clone(),
            audit.clone(),
        );
        let equipment = Arc::new(EquipmentRegistry::new(
            store.clone(),
            clock.clone(),
            audit.clone(),
        ));
        let equipment_turnovers = EquipmentTurnoverTracker::new(
            store.clone(),
            equipment.clone(),
            clock.clone(),
            turnover_config,
            audit,
        );

        Self {
            store,
            clock,
            locks,
            beds,
            queue,
            coordinator,
            turnovers,
            equipment,
            equipment_turnovers,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // Rooms and beds

    pub fn provision_room(&self, request: CreateRoomRequest) -> Result<Room> {
        self.beds.provision_room(request)
    }

    pub fn list_rooms(&self) -> Result<Vec<Room>> {
        self.beds.list_rooms()
    }

    pub fn room_readiness(&self, room_id: &str) -> Result<RoomReadiness> {
        room_readiness(self.store.as_ref(), room_id, self.clock.now())
    }

    /// Create a bed and offer it to the queue straight away.
    ///
    /// Returns the bed as it stands after that attempt.
    pub async fn provision_bed(&self, request: CreateBedRequest) -> Result<Bed> {
        let bed = self.beds.provision_bed(request)?;
        Ok(self.offer_to_queue(bed).await)
    }

    pub fn get_bed(&self, bed_id: &str) -> Result<Bed> {
        self.beds.get(bed_id)
    }

    pub fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>> {
        self.beds.list(filter)
    }

    /// Administrative status change. A bed made `available` is offered to
    /// the queue.
    pub async fn set_bed_status(&self, bed_id: &str, status: BedStatus) -> Result<Bed> {
        let bed = {
            let _guard = self.locks.acquire(bed_id).await;
            self.beds.set_status(bed_id, status)?
        };
        if bed.status == BedStatus::Available {
            Ok(self.offer_to_queue(bed).await)
        } else {
            Ok(bed)
        }
    }

    async fn offer_to_queue(&self, bed: Bed) -> Bed {
        match self.coordinator.on_bed_available(&bed.id).await {
            Ok(Some(assignment)) => assignment.bed,
            Ok(None) => bed,
            Err(e) => {
                warn!(bed_id = %bed.id, error = %e, "Assignment attempt failed");
                bed
            }
        }
    }

    // Bed turnovers

    pub async fn start_bed_turnover(
        &self,
        bed_id: &str,
        request: StartTurnoverRequest,
    ) -> Result<TurnoverTransition> {
        self.turnovers.start_turnover(bed_id, request).await
    }

    pub fn get_bed_status_with_time_remaining(&self, bed_id: &str) -> Result<BedStatusReport> {
        self.turnovers.get_status(bed_id)
    }

    pub async fn complete_bed_cleaning(&self, bed_id: &str) -> Result<CompletionOutcome> {
        self.turnovers
            .complete_turnover(bed_id, CompletedBy::Staff)
            .await
    }

    pub async fn cancel_bed_turnover(
        &self,
        bed_id: &str,
        reason: &str,
    ) -> Result<TurnoverTransition> {
        self.turnovers.cancel_turnover(bed_id, reason).await
    }

    pub fn bed_turnover_history(
        &self,
        bed_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BedTurnover>> {
        self.turnovers.history(bed_id, limit, offset)
    }

    pub fn active_bed_turnovers(&self) -> Result<Vec<BedStatusReport>> {
        self.turnovers.active_reports()
    }

    // Queue and assignment

    /// Put a patient on the waiting list.
    ///
    /// Matching runs when a bed becomes available, not here. A bed that is
    /// already available is only claimed through
    /// [`assign_bed_to_patient`](Self::assign_bed_to_patient).
    pub fn add_patient_to_queue(&self, request: EnqueueRequest) -> Result<PatientQueueEntry> {
        self.queue.enqueue(request)
    }

    pub fn get_queue_entry(&self, entry_id: &str) -> Result<PatientQueueEntry> {
        self.queue.get(entry_id)
    }

    pub fn list_queue(&self, filter: &QueueFilter) -> Result<Vec<PatientQueueEntry>> {
        self.queue.list(filter)
    }

    pub fn count_queue(&self, filter: &QueueFilter) -> Result<i64> {
        self.queue.count(filter)
    }

    pub fn cancel_queue_entry(
        &self,
        entry_id: &str,
        reason: Option<String>,
    ) -> Result<PatientQueueEntry> {
        self.queue.cancel(entry_id, reason)
    }

    pub async fn assign_next_patient_to_bed(&self, bed_id: &str) -> Result<Assignment> {
        self.coordinator.assign_next_patient_to_bed(bed_id).await
    }

    pub async fn assign_bed_to_patient(&self, entry_id: &str) -> Result<Assignment> {
        self.coordinator.assign_bed_to_patient(entry_id).await
    }

    // Equipment

    pub fn provision_equipment(&self, request: CreateEquipmentRequest) -> Result<Equipment> {
        self.equipment.provision(request)
    }

    pub fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        self.equipment.list(filter)
    }

    pub async fn set_equipment_status(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
    ) -> Result<Equipment> {
        self.equipment_turnovers
            .set_status(equipment_id, status)
            .await
    }

    pub async fn mark_equipment_for_cleaning(
        &self,
        equipment_id: &str,
        request: StartCleaningRequest,
    ) -> Result<EquipmentTransition> {
        self.equipment_turnovers
            .start_cleaning(equipment_id, request)
            .await
    }

    pub async fn complete_equipment_cleaning(
        &self,
        equipment_id: &str,
    ) -> Result<EquipmentTransition> {
        self.equipment_turnovers
            .complete_cleaning(equipment_id, CompletedBy::Staff)
            .await
    }

    pub async fn cancel_equipment_cleaning(
        &self,
        equipment_id: &str,
        reason: &str,
    ) -> Result<EquipmentTransition> {
        self.equipment_turnovers
            .cancel_cleaning(equipment_id, reason)
            .await
    }

    pub fn get_equipment_status_with_time_remaining(
        &self,
        equipment_id: &str,
    ) -> Result<EquipmentStatusReport> {
        self.equipment_turnovers.get_status(equipment_id)
    }

    pub fn equipment_turnover_history(
        &self,
        equipment_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EquipmentTurnover>> {
        self.equipment_turnovers
            .history(equipment_id, limit, offset)
    }

    // Sweeper support

    pub(crate) fn turnovers(&self) -> &TurnoverTracker {
        &self.turnovers
    }

    pub(crate) fn equipment_turnovers(&self) -> &EquipmentTurnoverTracker {
        &self.equipment_turnovers
    }
}
