//! Bed turnover lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    BedStatusReport, BedTurnover, CleaningCycle, StartTurnoverRequest, TurnoverConfig,
    TurnoverFilter, TurnoverStatus,
};
use crate::assignment::{Assignment, AssignmentCoordinator};
use crate::audit::{AuditEvent, AuditHandle, CompletedBy};
use crate::bed::{Bed, BedRegistry, BedStatus};
use crate::clock::Clock;
use crate::error::{EntityKind, Result, TurnoverError};
use crate::locks::KeyedLocks;
use crate::metrics;
use crate::store::{FacilityStore, TurnoverClose};

/// A bed together with the turnover that just changed it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TurnoverTransition {
    pub bed: Bed,
    pub turnover: BedTurnover,
}

/// Result of completing a turnover.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionOutcome {
    /// The bed after completion, occupied if an assignment was made.
    pub bed: Bed,
    pub turnover: BedTurnover,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Assignment>,
}

/// Drives beds from discharge through cleaning and back to `available`.
pub struct TurnoverTracker {
    store: Arc<dyn FacilityStore>,
    registry: Arc<BedRegistry>,
    coordinator: Arc<AssignmentCoordinator>,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
    config: TurnoverConfig,
    audit: Option<AuditHandle>,
}

impl TurnoverTracker {
    pub fn new(
        store: Arc<dyn FacilityStore>,
        registry: Arc<BedRegistry>,
        coordinator: Arc<AssignmentCoordinator>,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
        config: TurnoverConfig,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            registry,
            coordinator,
            locks,
            clock,
            config,
            audit,
        }
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }

    /// Discharge the occupant and start cleaning.
    ///
    /// The bed release and the new turnover record are committed together.
    pub async fn start_turnover(
        &self,
        bed_id: &str,
        request: StartTurnoverRequest,
    ) -> Result<TurnoverTransition> {
        let _guard = self.locks.acquire(bed_id).await;

        let bed = self.registry.get(bed_id)?;
        if bed.status != BedStatus::Occupied {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Bed,
                bed_id,
                bed.status,
                "start turnover on",
            ));
        }
        if self.store.active_bed_turnover(bed_id)?.is_some() {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Bed,
                bed_id,
                TurnoverStatus::Cleaning,
                "start turnover on",
            ));
        }

        let occupant = bed.patient_id.clone().ok_or_else(|| {
            TurnoverError::Database(format!("occupied bed {} has no patient", bed_id))
        })?;
        let previous_patient_id = match request.previous_patient_id {
            Some(ref patient) if *patient != occupant => {
                return Err(TurnoverError::Validation(format!(
                    "patient {} does not occupy bed {}",
                    patient, bed_id
                )));
            }
            _ => occupant,
        };
        let minutes = self
            .config
            .resolve_minutes(request.estimated_duration_minutes, request.turnover_type)?;

        let release = self.registry.prepare_release(&bed)?;
        let now = release.updated_at;
        let turnover = BedTurnover {
            id: Uuid::new_v4().to_string(),
            bed_id: bed_id.to_string(),
            previous_patient_id,
            status: TurnoverStatus::Cleaning,
            turnover_type: request.turnover_type,
            discharge_time: now,
            cleaning_start_time: now,
            estimated_cleaning_duration_minutes: minutes,
            actual_completion_time: None,
            cancel_reason: None,
            notes: request.notes,
        };
        let bed = self.store.begin_bed_turnover(&release, &turnover)?;

        info!(
            bed_id,
            turnover_id = %turnover.id,
            patient_id = %turnover.previous_patient_id,
            turnover_type = %turnover.turnover_type,
            estimated_minutes = minutes,
            "Bed turnover started"
        );
        metrics::TURNOVERS_STARTED
            .with_label_values(&["bed", turnover.turnover_type.as_str()])
            .inc();
        self.emit(AuditEvent::TurnoverStarted {
            turnover_id: turnover.id.clone(),
            bed_id: bed_id.to_string(),
            previous_patient_id: turnover.previous_patient_id.clone(),
            turnover_type: turnover.turnover_type.to_string(),
            estimated_minutes: minutes,
        })
        .await;

        Ok(TurnoverTransition { bed, turnover })
    }

    /// Finish cleaning, free the bed and offer it to the queue.
    ///
    /// Assignment runs under the same bed lock, so nobody can observe the
    /// bed `available` in between. A failed assignment attempt is logged and
    /// leaves the completed bed available.
    pub async fn complete_turnover(
        &self,
        bed_id: &str,
        completed_by: CompletedBy,
    ) -> Result<CompletionOutcome> {
        let guard = self.locks.acquire(bed_id).await;

        let bed = self.registry.get(bed_id)?;
        let active = self.cleaning_turnover(&bed, "complete cleaning on")?;

        let write = self.registry.prepare_transition(&bed, BedStatus::Available)?;
        let now = write.updated_at;
        let close = TurnoverClose {
            turnover_id: active.id.clone(),
            status: TurnoverStatus::Completed,
            at: now,
            cancel_reason: None,
        };
        let (bed, turnover) = self.store.close_bed_turnover(&close, &write)?;

        let actual_minutes = minutes_between(turnover.cleaning_start_time, now);
        info!(
            bed_id,
            turnover_id = %turnover.id,
            actual_minutes,
            completed_by = completed_by.as_str(),
            "Bed turnover completed"
        );
        metrics::TURNOVERS_COMPLETED
            .with_label_values(&["bed", completed_by.as_str()])
            .inc();
        metrics::TURNOVER_DURATION
            .with_label_values(&["bed", turnover.turnover_type.as_str()])
            .observe(actual_minutes);
        self.emit(AuditEvent::TurnoverCompleted {
            turnover_id: turnover.id.clone(),
            bed_id: bed_id.to_string(),
            actual_minutes,
            completed_by,
        })
        .await;

        let assignment = match self.coordinator.assign_locked(&guard).await {
            Ok(assignment) => assignment,
            Err(e) => {
                error!(bed_id, error = %e, "Assignment after turnover completion failed");
                None
            }
        };
        let bed = match assignment {
            Some(ref a) => a.bed.clone(),
            None => bed,
        };

        Ok(CompletionOutcome {
            bed,
            turnover,
            assignment,
        })
    }

    /// Abort cleaning; the bed goes to `maintenance`, never straight back to
    /// `available`.
    pub async fn cancel_turnover(&self, bed_id: &str, reason: &str) -> Result<TurnoverTransition> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TurnoverError::Validation(
                "a cancellation reason is required".into(),
            ));
        }

        let _guard = self.locks.acquire(bed_id).await;

        let bed = self.registry.get(bed_id)?;
        let active = self.cleaning_turnover(&bed, "cancel turnover on")?;

        let write = self
            .registry
            .prepare_transition(&bed, BedStatus::Maintenance)?;
        let close = TurnoverClose {
            turnover_id: active.id.clone(),
            status: TurnoverStatus::Cancelled,
            at: write.updated_at,
            cancel_reason: Some(reason.to_string()),
        };
        let (bed, turnover) = self.store.close_bed_turnover(&close, &write)?;

        info!(bed_id, turnover_id = %turnover.id, reason, "Bed turnover cancelled");
        metrics::TURNOVERS_CANCELLED.with_label_values(&["bed"]).inc();
        self.emit(AuditEvent::TurnoverCancelled {
            turnover_id: turnover.id.clone(),
            bed_id: bed_id.to_string(),
            reason: reason.to_string(),
        })
        .await;

        Ok(TurnoverTransition { bed, turnover })
    }

    /// Current status with time remaining. Never takes the bed lock.
    pub fn get_status(&self, bed_id: &str) -> Result<BedStatusReport> {
        let bed = self.registry.get(bed_id)?;
        let active = self.store.active_bed_turnover(bed_id)?;
        Ok(BedStatusReport::new(&bed, active.as_ref(), self.clock.now()))
    }

    /// Turnover history for one bed, newest first.
    pub fn history(&self, bed_id: &str, limit: i64, offset: i64) -> Result<Vec<BedTurnover>> {
        self.registry.get(bed_id)?;
        self.store.list_bed_turnovers(
            &TurnoverFilter::new()
                .with_subject(bed_id)
                .with_limit(limit)
                .with_offset(offset),
        )
    }

    /// Every bed currently being cleaned, with live progress.
    pub fn active_reports(&self) -> Result<Vec<BedStatusReport>> {
        let now = self.clock.now();
        let active = self
            .store
            .list_bed_turnovers(&TurnoverFilter::new().active().with_limit(i64::MAX))?;

        let mut reports = Vec::with_capacity(active.len());
        for turnover in &active {
            let bed = self.registry.get(&turnover.bed_id)?;
            reports.push(BedStatusReport::new(&bed, Some(turnover), now));
        }
        Ok(reports)
    }

    /// Beds whose cleaning estimate has elapsed at `now`.
    pub fn due_beds(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let active = self
            .store
            .list_bed_turnovers(&TurnoverFilter::new().active().with_limit(i64::MAX))?;
        Ok(active
            .into_iter()
            .filter(|t| t.status_at(now) == TurnoverStatus::Ready)
            .map(|t| t.bed_id)
            .collect())
    }

    fn cleaning_turnover(&self, bed: &Bed, operation: &str) -> Result<BedTurnover> {
        match self.store.active_bed_turnover(&bed.id)? {
            Some(t) if t.status == TurnoverStatus::Cleaning && bed.status == BedStatus::Cleaning => {
                Ok(t)
            }
            _ => {
                debug!(bed_id = %bed.id, status = %bed.status, "No turnover in cleaning");
                Err(TurnoverError::invalid_transition(
                    EntityKind::Bed,
                    &bed.id,
                    bed.status,
                    operation,
                ))
            }
        }
    }
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds().max(0) as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::{BedType, CreateBedRequest, CreateRoomRequest};
    use crate::queue::{EnqueueRequest, PatientQueue, QueueConfig, QueueCriteria, QueueStatus};
    use crate::store::SqliteFacilityStore;
    use crate::testing::ManualClock;
    use crate::turnover::TurnoverType;

    struct Fixture {
        tracker: TurnoverTracker,
        registry: Arc<BedRegistry>,
        queue: Arc<PatientQueue>,
        clock: Arc<ManualClock>,
        bed: Bed,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn FacilityStore> = Arc::new(SqliteFacilityStore::in_memory().unwrap());
        let clock = Arc::new(ManualClock::default());
        let locks = Arc::new(KeyedLocks::new());
        let registry = Arc::new(BedRegistry::new(store.clone(), clock.clone(), None));
        let queue = Arc::new(PatientQueue::new(
            store.clone(),
            clock.clone(),
            QueueConfig::default(),
            None,
        ));
        let coordinator = Arc::new(AssignmentCoordinator::new(
            store.clone(),
            registry.clone(),
            queue.clone(),
            locks.clone(),
            None,
        ));
        let tracker = TurnoverTracker::new(
            store,
            registry.clone(),
            coordinator,
            locks,
            clock.clone(),
            TurnoverConfig::default(),
            None,
        );

        let room = registry
            .provision_room(CreateRoomRequest {
                room_number: "7".to_string(),
                department: "Cardiology".to_string(),
                floor: None,
            })
            .unwrap();
        let bed = registry
            .provision_bed(CreateBedRequest {
                room_id: room.id,
                bed_number: "1".to_string(),
                bed_type: BedType::Standard,
                isolation_capable: false,
            })
            .unwrap();
        let bed = registry.assign_patient(&bed.id, "p-old").unwrap();

        Fixture {
            tracker,
            registry,
            queue,
            clock,
            bed,
        }
    }

    fn thirty_minutes() -> StartTurnoverRequest {
        StartTurnoverRequest {
            estimated_duration_minutes: Some(30),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_turnover_releases_bed() {
        let f = fixture();
        let started = f
            .tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();

        assert_eq!(started.bed.status, BedStatus::Cleaning);
        assert!(started.bed.patient_id.is_none());
        assert!(started.bed.discharge_date.is_some());
        assert_eq!(started.turnover.status, TurnoverStatus::Cleaning);
        assert_eq!(started.turnover.previous_patient_id, "p-old");
        assert_eq!(
            started.turnover.discharge_time,
            started.turnover.cleaning_start_time
        );
    }

    #[tokio::test]
    async fn test_start_turnover_twice_is_invalid() {
        let f = fixture();
        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();
        let err = f
            .tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap_err();
        assert!(matches!(err, TurnoverError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_start_turnover_validation_leaves_bed_occupied() {
        let f = fixture();

        let err = f
            .tracker
            .start_turnover(
                &f.bed.id,
                StartTurnoverRequest {
                    estimated_duration_minutes: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TurnoverError::Validation(_)));

        let err = f
            .tracker
            .start_turnover(
                &f.bed.id,
                StartTurnoverRequest {
                    previous_patient_id: Some("someone-else".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TurnoverError::Validation(_)));

        let bed = f.registry.get(&f.bed.id).unwrap();
        assert_eq!(bed.status, BedStatus::Occupied);
        assert_eq!(bed.patient_id.as_deref(), Some("p-old"));
    }

    #[tokio::test]
    async fn test_default_duration_by_type() {
        let f = fixture();
        let started = f
            .tracker
            .start_turnover(
                &f.bed.id,
                StartTurnoverRequest {
                    turnover_type: TurnoverType::Isolation,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(started.turnover.estimated_cleaning_duration_minutes, 90);
    }

    #[tokio::test]
    async fn test_status_progress_over_time() {
        let f = fixture();
        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();

        f.clock.advance_minutes(10);
        let report = f.tracker.get_status(&f.bed.id).unwrap();
        let cycle = report.cycle.unwrap();
        assert_eq!(cycle.time_remaining_minutes, 20.0);
        assert_eq!(cycle.progress_percentage, 33.3);

        f.clock.advance_minutes(25);
        let cycle = f.tracker.get_status(&f.bed.id).unwrap().cycle.unwrap();
        assert_eq!(cycle.time_remaining_minutes, 0.0);
        assert_eq!(cycle.progress_percentage, 100.0);
        assert_eq!(cycle.process_status, TurnoverStatus::Ready);
    }

    #[tokio::test]
    async fn test_complete_assigns_waiting_patient() {
        let f = fixture();
        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();
        let entry = f
            .queue
            .enqueue(EnqueueRequest {
                patient_id: "p-new".to_string(),
                priority: 2,
                criteria: QueueCriteria::for_department("Cardiology"),
                notes: None,
            })
            .unwrap();

        f.clock.advance_minutes(31);
        let outcome = f
            .tracker
            .complete_turnover(&f.bed.id, CompletedBy::Staff)
            .await
            .unwrap();

        assert_eq!(outcome.turnover.status, TurnoverStatus::Completed);
        assert!(outcome.turnover.actual_completion_time.is_some());
        assert_eq!(outcome.bed.status, BedStatus::Occupied);
        assert_eq!(outcome.bed.patient_id.as_deref(), Some("p-new"));
        let assignment = outcome.assignment.unwrap();
        assert_eq!(assignment.entry.id, entry.id);
        assert_eq!(
            f.queue.get(&entry.id).unwrap().status,
            QueueStatus::Assigned
        );
    }

    #[tokio::test]
    async fn test_complete_without_match_leaves_available() {
        let f = fixture();
        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();

        let outcome = f
            .tracker
            .complete_turnover(&f.bed.id, CompletedBy::Staff)
            .await
            .unwrap();
        assert_eq!(outcome.bed.status, BedStatus::Available);
        assert!(outcome.assignment.is_none());
    }

    #[tokio::test]
    async fn test_complete_on_available_bed_is_invalid() {
        let f = fixture();
        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();
        f.tracker
            .complete_turnover(&f.bed.id, CompletedBy::Staff)
            .await
            .unwrap();

        let err = f
            .tracker
            .complete_turnover(&f.bed.id, CompletedBy::Staff)
            .await
            .unwrap_err();
        assert!(matches!(err, TurnoverError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_beds_leave_no_locks_behind() {
        let f = fixture();
        for i in 0..1000 {
            let bed_id = format!("missing-{}", i);
            let err = f
                .tracker
                .start_turnover(&bed_id, thirty_minutes())
                .await
                .unwrap_err();
            assert!(matches!(err, TurnoverError::NotFound { .. }));
            f.tracker
                .complete_turnover(&bed_id, CompletedBy::Staff)
                .await
                .unwrap_err();
        }
        assert!(f.tracker.locks.is_empty());

        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();
        assert!(f.tracker.locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_moves_bed_to_maintenance() {
        let f = fixture();
        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();

        let err = f.tracker.cancel_turnover(&f.bed.id, " ").await.unwrap_err();
        assert!(matches!(err, TurnoverError::Validation(_)));

        let cancelled = f
            .tracker
            .cancel_turnover(&f.bed.id, "biohazard spill")
            .await
            .unwrap();
        assert_eq!(cancelled.bed.status, BedStatus::Maintenance);
        assert_eq!(cancelled.turnover.status, TurnoverStatus::Cancelled);
        assert_eq!(
            cancelled.turnover.cancel_reason.as_deref(),
            Some("biohazard spill")
        );
        assert!(cancelled.turnover.actual_completion_time.is_none());

        let err = f
            .tracker
            .cancel_turnover(&f.bed.id, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, TurnoverError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_due_beds_and_history() {
        let f = fixture();
        f.tracker
            .start_turnover(&f.bed.id, thirty_minutes())
            .await
            .unwrap();

        assert!(f.tracker.due_beds(f.clock.now()).unwrap().is_empty());
        assert_eq!(f.tracker.active_reports().unwrap().len(), 1);

        f.clock.advance_minutes(30);
        assert_eq!(f.tracker.due_beds(f.clock.now()).unwrap(), vec![f.bed.id.clone()]);

        f.tracker
            .complete_turnover(&f.bed.id, CompletedBy::Sweeper)
            .await
            .unwrap();
        assert!(f.tracker.active_reports().unwrap().is_empty());
        assert_eq!(f.tracker.history(&f.bed.id, 10, 0).unwrap().len(), 1);
    }
}
