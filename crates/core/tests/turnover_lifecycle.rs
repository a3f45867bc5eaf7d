//! Turnover lifecycle integration tests.
//!
//! These tests drive a bed through its whole cycle via the service:
//! occupied -> cleaning -> available -> occupied by the next waiting patient

use std::sync::Arc;

use bedflow_core::{
    testing::{fixtures, ManualClock},
    BedStatus, BedType, QueueConfig, QueueCriteria, QueueFilter, QueueOrdering, QueueStatus,
    SweeperConfig, TurnoverConfig, TurnoverError, TurnoverService, TurnoverStatus,
    TurnoverSweeper, TurnoverType,
};

/// Service plus one Cardiology room.
struct TestHarness {
    service: Arc<TurnoverService>,
    clock: Arc<ManualClock>,
    room_id: String,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_queue(QueueConfig::default())
    }

    fn with_queue(queue: QueueConfig) -> Self {
        let (service, clock) = fixtures::service_with(TurnoverConfig::default(), queue);
        let room = service
            .provision_room(fixtures::room("204", "Cardiology"))
            .expect("Failed to provision room");
        Self {
            service: Arc::new(service),
            clock,
            room_id: room.id,
        }
    }

    /// A bed occupied by `patient_id`, via the queue.
    async fn occupied_bed(&self, bed_number: &str, patient_id: &str) -> String {
        self.service
            .add_patient_to_queue(fixtures::patient(patient_id, 0, "Cardiology"))
            .expect("Failed to enqueue");
        let bed = self
            .service
            .provision_bed(fixtures::bed(&self.room_id, bed_number))
            .await
            .expect("Failed to provision bed");
        assert_eq!(bed.status, BedStatus::Occupied);
        assert_eq!(bed.patient_id.as_deref(), Some(patient_id));
        bed.id
    }

    /// A bed in cleaning with the given estimate.
    async fn cleaning_bed(&self, bed_number: &str, minutes: u32) -> String {
        let bed_id = self
            .occupied_bed(bed_number, &format!("discharged-{}", bed_number))
            .await;
        self.service
            .start_bed_turnover(&bed_id, fixtures::turnover(minutes))
            .await
            .expect("Failed to start turnover");
        bed_id
    }
}

#[tokio::test]
async fn test_progress_while_cleaning() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;

    harness.clock.advance_minutes(10);
    let report = harness
        .service
        .get_bed_status_with_time_remaining(&bed_id)
        .unwrap();
    let cycle = report.cycle.expect("cycle should be reported");
    assert_eq!(report.current_status, BedStatus::Cleaning);
    assert_eq!(cycle.process_status, TurnoverStatus::Cleaning);
    assert!((cycle.time_remaining_minutes - 20.0).abs() < 0.01);
    assert!((cycle.progress_percentage - 33.3).abs() < 0.1);
}

#[tokio::test]
async fn test_overdue_turnover_reports_ready_but_bed_stays_cleaning() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;

    harness.clock.advance_minutes(35);
    let report = harness
        .service
        .get_bed_status_with_time_remaining(&bed_id)
        .unwrap();
    let cycle = report.cycle.expect("cycle should be reported");
    assert_eq!(cycle.time_remaining_minutes, 0.0);
    assert_eq!(cycle.progress_percentage, 100.0);
    assert_eq!(cycle.process_status, TurnoverStatus::Ready);
    // Only an explicit completion frees the bed.
    assert_eq!(report.current_status, BedStatus::Cleaning);
}

#[tokio::test]
async fn test_completion_assigns_matching_waiting_patient() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;
    let waiting = harness
        .service
        .add_patient_to_queue(fixtures::patient("p-next", 2, "Cardiology"))
        .unwrap();

    harness.clock.advance_minutes(25);
    let outcome = harness.service.complete_bed_cleaning(&bed_id).await.unwrap();

    assert_eq!(outcome.turnover.status, TurnoverStatus::Completed);
    let assignment = outcome.assignment.expect("patient should be assigned");
    assert_eq!(assignment.patient_id(), "p-next");
    assert_eq!(outcome.bed.status, BedStatus::Occupied);
    assert_eq!(outcome.bed.patient_id.as_deref(), Some("p-next"));

    let entry = harness.service.get_queue_entry(&waiting.id).unwrap();
    assert_eq!(entry.status, QueueStatus::Assigned);
    assert_eq!(entry.assigned_bed_id.as_deref(), Some(bed_id.as_str()));
}

#[tokio::test]
async fn test_completion_without_match_leaves_bed_available() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;
    let elsewhere = harness
        .service
        .add_patient_to_queue(fixtures::patient("p-ortho", 5, "Orthopedics"))
        .unwrap();

    let outcome = harness.service.complete_bed_cleaning(&bed_id).await.unwrap();

    assert!(outcome.assignment.is_none());
    assert_eq!(outcome.bed.status, BedStatus::Available);
    assert!(outcome.bed.patient_id.is_none());
    let entry = harness.service.get_queue_entry(&elsewhere.id).unwrap();
    assert_eq!(entry.status, QueueStatus::Waiting);
}

#[tokio::test]
async fn test_completing_available_bed_is_invalid() {
    let harness = TestHarness::new();
    let bed = harness
        .service
        .provision_bed(fixtures::bed(&harness.room_id, "A"))
        .await
        .unwrap();
    assert_eq!(bed.status, BedStatus::Available);

    let err = harness
        .service
        .complete_bed_cleaning(&bed.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoverError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_start_requires_occupied_bed_and_single_active_turnover() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;

    let err = harness
        .service
        .start_bed_turnover(&bed_id, fixtures::turnover(30))
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoverError::InvalidTransition { .. }));

    let history = harness
        .service
        .bed_turnover_history(&bed_id, 100, 0)
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_default_duration_follows_turnover_type() {
    let harness = TestHarness::new();
    let bed_id = harness.occupied_bed("A", "p-iso").await;

    let transition = harness
        .service
        .start_bed_turnover(
            &bed_id,
            bedflow_core::StartTurnoverRequest {
                turnover_type: TurnoverType::Isolation,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(transition.turnover.estimated_cleaning_duration_minutes, 90);
    assert_eq!(transition.turnover.previous_patient_id, "p-iso");
    assert!(transition.bed.patient_id.is_none());
}

#[tokio::test]
async fn test_cancel_puts_bed_in_maintenance_and_restore_offers_it() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;

    let cancelled = harness
        .service
        .cancel_bed_turnover(&bed_id, "bed frame damaged")
        .await
        .unwrap();
    assert_eq!(cancelled.bed.status, BedStatus::Maintenance);
    assert_eq!(cancelled.turnover.status, TurnoverStatus::Cancelled);

    harness
        .service
        .add_patient_to_queue(fixtures::patient("p-wait", 0, "Cardiology"))
        .unwrap();
    let restored = harness
        .service
        .set_bed_status(&bed_id, BedStatus::Available)
        .await
        .unwrap();
    assert_eq!(restored.status, BedStatus::Occupied);
    assert_eq!(restored.patient_id.as_deref(), Some("p-wait"));
}

#[tokio::test]
async fn test_higher_priority_wins_then_earliest_queued() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;
    let second_bed = harness.cleaning_bed("B", 30).await;

    harness
        .service
        .add_patient_to_queue(fixtures::patient("p-early", 1, "Cardiology"))
        .unwrap();
    harness.clock.advance_minutes(1);
    harness
        .service
        .add_patient_to_queue(fixtures::patient("p-urgent", 5, "Cardiology"))
        .unwrap();
    harness.clock.advance_minutes(1);
    harness
        .service
        .add_patient_to_queue(fixtures::patient("p-late", 1, "Cardiology"))
        .unwrap();

    let first = harness.service.complete_bed_cleaning(&bed_id).await.unwrap();
    assert_eq!(first.assignment.unwrap().patient_id(), "p-urgent");

    let second = harness
        .service
        .complete_bed_cleaning(&second_bed)
        .await
        .unwrap();
    assert_eq!(second.assignment.unwrap().patient_id(), "p-early");

    let waiting = harness
        .service
        .list_queue(&QueueFilter::new().with_status(QueueStatus::Waiting))
        .unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].patient_id, "p-late");
}

#[tokio::test]
async fn test_aging_lets_long_wait_overtake_priority() {
    let harness = TestHarness::with_queue(QueueConfig {
        ordering: QueueOrdering::Aging,
        aging_points_per_hour: 1.0,
        ..Default::default()
    });
    let bed_id = harness.cleaning_bed("A", 30).await;

    harness
        .service
        .add_patient_to_queue(fixtures::patient("p-patient", 1, "Cardiology"))
        .unwrap();
    harness.clock.advance_minutes(5 * 60);
    harness
        .service
        .add_patient_to_queue(fixtures::patient("p-fresh", 3, "Cardiology"))
        .unwrap();

    let outcome = harness.service.complete_bed_cleaning(&bed_id).await.unwrap();
    assert_eq!(outcome.assignment.unwrap().patient_id(), "p-patient");
}

#[tokio::test]
async fn test_bed_type_and_isolation_criteria() {
    let harness = TestHarness::new();
    harness
        .service
        .add_patient_to_queue(fixtures::patient_with(
            "p-icu",
            9,
            QueueCriteria::for_department("Cardiology")
                .with_bed_type(BedType::Icu)
                .with_isolation(),
        ))
        .unwrap();

    let standard = harness
        .service
        .provision_bed(fixtures::bed(&harness.room_id, "A"))
        .await
        .unwrap();
    assert_eq!(standard.status, BedStatus::Available);

    let icu = harness
        .service
        .provision_bed(fixtures::typed_bed(&harness.room_id, "B", BedType::Icu, true))
        .await
        .unwrap();
    assert_eq!(icu.status, BedStatus::Occupied);
    assert_eq!(icu.patient_id.as_deref(), Some("p-icu"));
}

#[tokio::test]
async fn test_assign_bed_to_patient_and_cancelled_entry_is_skipped() {
    let harness = TestHarness::new();
    let bed = harness
        .service
        .provision_bed(fixtures::bed(&harness.room_id, "A"))
        .await
        .unwrap();

    let cancelled = harness
        .service
        .add_patient_to_queue(fixtures::patient("p-gone", 9, "Orthopedics"))
        .unwrap();
    harness
        .service
        .cancel_queue_entry(&cancelled.id, Some("transferred".to_string()))
        .unwrap();
    let err = harness
        .service
        .assign_bed_to_patient(&cancelled.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoverError::InvalidTransition { .. }));

    let entry = harness
        .service
        .add_patient_to_queue(fixtures::patient("p-walk-in", 0, "Orthopedics"))
        .unwrap();
    let err = harness
        .service
        .assign_bed_to_patient(&entry.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoverError::NoCompatibleBed(_)));

    let entry = harness
        .service
        .add_patient_to_queue(fixtures::patient("p-cardio", 0, "Cardiology"))
        .unwrap();
    // Enqueueing never claims a bed that is already available; it waits
    // for a bed to free up or for an explicit request.
    assert_eq!(entry.status, QueueStatus::Waiting);
    assert_eq!(
        harness.service.get_bed(&bed.id).unwrap().status,
        BedStatus::Available
    );
    let assignment = harness
        .service
        .assign_bed_to_patient(&entry.id)
        .await
        .unwrap();
    assert_eq!(assignment.bed.id, bed.id);
    assert_eq!(assignment.entry.status, QueueStatus::Assigned);
}

#[tokio::test]
async fn test_equipment_cycle_and_room_readiness() {
    let harness = TestHarness::new();
    let pump = harness
        .service
        .provision_equipment(fixtures::equipment("Pump 3", Some(&harness.room_id)))
        .unwrap();

    harness
        .service
        .mark_equipment_for_cleaning(&pump.id, fixtures::cleaning(15))
        .await
        .unwrap();
    let readiness = harness.service.room_readiness(&harness.room_id).unwrap();
    assert!(!readiness.ready);
    assert_eq!(readiness.pending_equipment, vec![pump.id.clone()]);

    harness.clock.advance_minutes(5);
    let report = harness
        .service
        .get_equipment_status_with_time_remaining(&pump.id)
        .unwrap();
    let cycle = report.cycle.expect("cycle should be reported");
    assert!((cycle.time_remaining_minutes - 10.0).abs() < 0.01);

    let done = harness
        .service
        .complete_equipment_cleaning(&pump.id)
        .await
        .unwrap();
    assert_eq!(done.turnover.status, TurnoverStatus::Completed);
    assert!(harness.service.room_readiness(&harness.room_id).unwrap().ready);
    assert_eq!(
        harness
            .service
            .equipment_turnover_history(&pump.id, 10, 0)
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_room_ready_once_every_cycle_has_elapsed() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;
    let pump = harness
        .service
        .provision_equipment(fixtures::equipment("Pump 4", Some(&harness.room_id)))
        .unwrap();
    harness
        .service
        .mark_equipment_for_cleaning(&pump.id, fixtures::cleaning(45))
        .await
        .unwrap();

    let readiness = harness.service.room_readiness(&harness.room_id).unwrap();
    assert_eq!(readiness.pending_beds, vec![bed_id.clone()]);
    assert_eq!(readiness.pending_equipment, vec![pump.id.clone()]);

    // The bed turnover is ready, the pump is not.
    harness.clock.advance_minutes(31);
    let readiness = harness.service.room_readiness(&harness.room_id).unwrap();
    assert!(!readiness.ready);
    assert!(readiness.pending_beds.is_empty());
    assert_eq!(readiness.pending_equipment, vec![pump.id.clone()]);

    harness.clock.advance_minutes(15);
    let readiness = harness.service.room_readiness(&harness.room_id).unwrap();
    assert!(readiness.ready);
    assert!(readiness.pending_equipment.is_empty());

    // Neither record has been closed yet.
    let report = harness
        .service
        .get_bed_status_with_time_remaining(&bed_id)
        .unwrap();
    assert_eq!(report.current_status, BedStatus::Cleaning);
}

#[tokio::test]
async fn test_sweeper_completes_due_turnover_and_assigns() {
    let harness = TestHarness::new();
    let bed_id = harness.cleaning_bed("A", 30).await;
    harness
        .service
        .add_patient_to_queue(fixtures::patient("p-next", 0, "Cardiology"))
        .unwrap();

    let sweeper = TurnoverSweeper::new(SweeperConfig::default(), harness.service.clone());
    harness.clock.advance_minutes(29);
    assert_eq!(sweeper.tick().await.unwrap().beds_completed, 0);

    harness.clock.advance_minutes(2);
    let report = sweeper.tick().await.unwrap();
    assert_eq!(report.beds_completed, 1);
    assert_eq!(report.assignments, 1);

    let bed = harness.service.get_bed(&bed_id).unwrap();
    assert_eq!(bed.status, BedStatus::Occupied);
    assert_eq!(bed.patient_id.as_deref(), Some("p-next"));

    let history = harness
        .service
        .bed_turnover_history(&bed_id, 10, 0)
        .unwrap();
    assert_eq!(history[0].status, TurnoverStatus::Completed);
}
