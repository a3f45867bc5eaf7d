//! Bed turnover API tests.
//!
//! Drive rooms, beds, turnovers, equipment and audit through the router
//! in-process.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::TestFixture;

#[tokio::test]
async fn test_health_and_config() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["turnover"]["standard_minutes"], 30);
    assert_eq!(response.body["queue"]["ordering"], "strict");
    assert_eq!(response.body["database_file"], "test.db");
}

#[tokio::test]
async fn test_turnover_progress_and_completion_assigns_patient() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    let bed_id = fixture.cleaning_bed(&room_id, "Cardiology", 30).await;

    fixture.clock.advance_minutes(10);
    let response = fixture
        .get(&format!("/api/v1/beds/{}/status", bed_id))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "current_status", json!("cleaning"));
    assert_json_path!(response.body, "process_status", json!("cleaning"));
    assert_json_path!(response.body, "time_remaining_minutes", json!(20.0));
    assert_json_path!(response.body, "progress_percentage", json!(33.3));
    assert_json_path!(response.body, "room_number", json!("204"));

    let entry = fixture.enqueue("p-next", 1, "Cardiology").await;

    let response = fixture
        .post(
            &format!("/api/v1/beds/{}/turnover/complete", bed_id),
            json!({}),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["turnover"]["status"], "completed");
    assert_eq!(response.body["bed"]["status"], "occupied");
    assert_eq!(response.body["bed"]["patient_id"], "p-next");
    assert_eq!(response.body["assignment"]["entry"]["id"], entry["id"]);

    let response = fixture
        .get(&format!("/api/v1/queue/{}", entry["id"].as_str().unwrap()))
        .await;
    assert_json_path!(response.body, "status", json!("assigned"));
    assert_json_path!(response.body, "assigned_bed_id", json!(bed_id));
}

#[tokio::test]
async fn test_overdue_turnover_reports_ready() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    let bed_id = fixture.cleaning_bed(&room_id, "Cardiology", 30).await;

    fixture.clock.advance_minutes(35);
    let response = fixture
        .get(&format!("/api/v1/beds/{}/status", bed_id))
        .await;
    assert_json_path!(response.body, "process_status", json!("ready"));
    assert_json_path!(response.body, "time_remaining_minutes", json!(0.0));
    assert_json_path!(response.body, "progress_percentage", json!(100.0));
    assert_json_path!(response.body, "current_status", json!("cleaning"));
}

#[tokio::test]
async fn test_completion_without_match_leaves_bed_available() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    let bed_id = fixture.cleaning_bed(&room_id, "Cardiology", 30).await;
    fixture.enqueue("p-ortho", 3, "Orthopedics").await;

    let response = fixture
        .post(
            &format!("/api/v1/beds/{}/turnover/complete", bed_id),
            json!({}),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["bed"]["status"], "available");
    assert!(response.body.get("assignment").is_none());

    let response = fixture.get("/api/v1/queue?status=waiting").await;
    assert_eq!(response.body["total"], 1);
}

#[tokio::test]
async fn test_error_mapping() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    let bed = fixture.bed(&room_id, "A").await;
    let bed_id = bed["id"].as_str().unwrap();

    // Completing an available bed
    let response = fixture
        .post(
            &format!("/api/v1/beds/{}/turnover/complete", bed_id),
            json!({}),
        )
        .await;
    assert_status!(response, StatusCode::CONFLICT);
    assert_json_path!(response.body, "kind", json!("invalid_transition"));

    // Unknown bed
    let response = fixture.get("/api/v1/beds/does-not-exist").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_json_path!(response.body, "kind", json!("not_found"));

    // Nobody waiting for this bed
    let response = fixture
        .post(&format!("/api/v1/beds/{}/assign", bed_id), json!({}))
        .await;
    assert_status!(response, StatusCode::CONFLICT);
    assert_json_path!(response.body, "kind", json!("no_compatible_bed"));

    // Blank room number
    let response = fixture
        .post(
            "/api/v1/rooms",
            json!({ "room_number": "  ", "department": "Cardiology" }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_json_path!(response.body, "kind", json!("validation_error"));

    // Unknown status filter
    let response = fixture.get("/api/v1/beds?status=sleeping").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_turnover_rejects_zero_duration() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    fixture.enqueue("p-1", 0, "Cardiology").await;
    let bed = fixture.bed(&room_id, "A").await;
    assert_eq!(bed["status"], "occupied");

    let response = fixture
        .post(
            &format!("/api/v1/beds/{}/turnover", bed["id"].as_str().unwrap()),
            json!({ "estimated_duration_minutes": 0 }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture
        .get(&format!("/api/v1/beds/{}", bed["id"].as_str().unwrap()))
        .await;
    assert_json_path!(response.body, "status", json!("occupied"));
}

#[tokio::test]
async fn test_cancel_then_restore_bed() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    let bed_id = fixture.cleaning_bed(&room_id, "Cardiology", 30).await;

    let response = fixture
        .post(
            &format!("/api/v1/beds/{}/turnover/cancel", bed_id),
            json!({ "reason": "rail broken" }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["bed"]["status"], "maintenance");
    assert_eq!(response.body["turnover"]["status"], "cancelled");
    assert_eq!(response.body["turnover"]["cancel_reason"], "rail broken");

    fixture.enqueue("p-wait", 0, "Cardiology").await;
    let response = fixture
        .put(
            &format!("/api/v1/beds/{}/status", bed_id),
            json!({ "status": "available" }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("occupied"));
    assert_json_path!(response.body, "patient_id", json!("p-wait"));

    // Occupied is reachable only through assignment
    let response = fixture
        .put(
            &format!("/api/v1/beds/{}/status", bed_id),
            json!({ "status": "maintenance" }),
        )
        .await;
    assert_status!(response, StatusCode::CONFLICT);

    let response = fixture
        .get(&format!("/api/v1/beds/{}/turnovers", bed_id))
        .await;
    assert_eq!(response.body["turnovers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_active_turnovers_and_bed_listing() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    let first = fixture.cleaning_bed(&room_id, "Cardiology", 30).await;
    fixture.cleaning_bed(&room_id, "Cardiology", 60).await;
    fixture.bed(&room_id, "Spare").await;

    let response = fixture.get("/api/v1/turnovers/active").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["turnovers"].as_array().unwrap().len(), 2);

    let response = fixture.get("/api/v1/beds?status=cleaning").await;
    assert_eq!(response.body["beds"].as_array().unwrap().len(), 2);

    let response = fixture
        .get(&format!("/api/v1/beds?room_id={}&limit=1", room_id))
        .await;
    assert_eq!(response.body["beds"].as_array().unwrap().len(), 1);
    assert_eq!(response.body["limit"], 1);

    let response = fixture
        .get(&format!("/api/v1/rooms/{}/readiness", room_id))
        .await;
    assert_json_path!(response.body, "ready", json!(false));
    assert!(response.body["pending_beds"]
        .as_array()
        .unwrap()
        .contains(&json!(first)));
}

#[tokio::test]
async fn test_equipment_cleaning_cycle() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;

    let response = fixture
        .post(
            "/api/v1/equipment",
            json!({ "name": "Pump 3", "equipment_type": "infusion_pump", "room_id": room_id }),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);
    assert_json_path!(response.body, "status", json!("in_use"));
    let equipment_id = response.body["id"].as_str().unwrap().to_string();

    let response = fixture
        .post(
            &format!("/api/v1/equipment/{}/cleaning", equipment_id),
            json!({ "estimated_duration_minutes": 20 }),
        )
        .await;
    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.body["equipment"]["status"], "cleaning");

    fixture.clock.advance_minutes(5);
    let response = fixture
        .get(&format!("/api/v1/equipment/{}/status", equipment_id))
        .await;
    assert_json_path!(response.body, "time_remaining_minutes", json!(15.0));
    assert_json_path!(response.body, "progress_percentage", json!(25.0));

    // Cleaning is left only through the cycle
    let response = fixture
        .put(
            &format!("/api/v1/equipment/{}/status", equipment_id),
            json!({ "status": "available" }),
        )
        .await;
    assert_status!(response, StatusCode::CONFLICT);

    let response = fixture
        .post(
            &format!("/api/v1/equipment/{}/cleaning/complete", equipment_id),
            json!({}),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["equipment"]["status"], "available");

    let response = fixture
        .put(
            &format!("/api/v1/equipment/{}/status", equipment_id),
            json!({ "status": "maintenance" }),
        )
        .await;
    assert_status!(response, StatusCode::OK);

    let response = fixture
        .get(&format!("/api/v1/equipment/{}/turnovers", equipment_id))
        .await;
    assert_eq!(response.body["turnovers"].as_array().unwrap().len(), 1);

    let response = fixture
        .get(&format!("/api/v1/rooms/{}/readiness", room_id))
        .await;
    assert_json_path!(response.body, "ready", json!(true));
}

#[tokio::test]
async fn test_audit_records_turnover_events() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    let bed_id = fixture.cleaning_bed(&room_id, "Cardiology", 30).await;

    // The audit writer persists asynchronously.
    let path = format!(
        "/api/v1/audit?subject_id={}&event_type=turnover_started",
        bed_id
    );
    let mut total = 0;
    for _ in 0..50 {
        let response = fixture.get(&path).await;
        assert_status!(response, StatusCode::OK);
        total = response.body["total"].as_i64().unwrap();
        if total > 0 {
            assert_eq!(response.body["events"][0]["subject_id"], bed_id);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(total, 1);
}

#[tokio::test]
async fn test_audit_filters_by_subject_kind_and_event_types() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    fixture.cleaning_bed(&room_id, "Cardiology", 30).await;

    // Events are written in order; once the turnover is in, so is the rest.
    let path = "/api/v1/audit?event_type=turnover_started,%20patient_queued";
    let mut total = 0;
    for _ in 0..50 {
        let response = fixture.get(path).await;
        assert_status!(response, StatusCode::OK);
        total = response.body["total"].as_i64().unwrap();
        if total == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(total, 2);

    let response = fixture.get("/api/v1/audit?subject_kind=queue_entry").await;
    assert_status!(response, StatusCode::OK);
    let events = response.body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["subject_kind"], "queue_entry");
    assert_eq!(events[0]["event_type"], "patient_queued");

    let response = fixture
        .get(&format!("/api/v1/audit?subject_kind=room&subject_id={}", room_id))
        .await;
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["events"][0]["event_type"], "room_provisioned");

    let response = fixture.get("/api/v1/audit?subject_kind=ward").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_json_path!(response.body, "kind", json!("validation_error"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    let room_id = fixture.room("204", "Cardiology").await;
    fixture.bed(&room_id, "A").await;

    let (status, body) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("bedflow_beds_by_status"));
    assert!(body.contains("bedflow_http_requests_total"));
}
