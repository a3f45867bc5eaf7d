//! Common test utilities for in-process API testing.
//!
//! The fixture wires a real service over a temporary SQLite database and a
//! manual clock, so tests can move time forward without sleeping.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use bedflow_core::{
    create_audit_system_with_clock, testing::ManualClock, AuditStore, Config, DatabaseConfig,
    QueueConfig, ServerConfig, SqliteAuditStore, SqliteFacilityStore, TurnoverService,
};

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_room_creation() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/rooms", json!({
///         "room_number": "204",
///         "department": "Cardiology"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Clock shared by the service and the audit trail
    pub clock: Arc<ManualClock>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_queue(QueueConfig::default()).await
    }

    pub async fn with_queue(queue: QueueConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            ..Default::default()
        };
        config.queue = queue;

        let clock = Arc::new(ManualClock::default());

        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let facility_store = Arc::new(
            SqliteFacilityStore::new(&db_path).expect("Failed to create facility store"),
        );

        let (audit_handle, audit_writer) =
            create_audit_system_with_clock(Arc::clone(&audit_store), 100, clock.clone());
        tokio::spawn(audit_writer.run());

        let service = Arc::new(TurnoverService::new(
            facility_store,
            config.turnover.clone(),
            config.queue.clone(),
            clock.clone(),
            Some(audit_handle),
        ));

        let state = Arc::new(bedflow_server::state::AppState::new(
            config,
            service,
            audit_store,
        ));
        let router = bedflow_server::api::create_router(state);

        Self {
            router,
            clock,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a DELETE request with JSON body.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> TestResponse {
        self.request("DELETE", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Raw text body, for endpoints that do not return JSON.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    // Domain helpers

    /// Create a room and return its id.
    pub async fn room(&self, room_number: &str, department: &str) -> String {
        let response = self
            .post(
                "/api/v1/rooms",
                json!({ "room_number": room_number, "department": department }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Provision a bed and return the response body.
    pub async fn bed(&self, room_id: &str, bed_number: &str) -> Value {
        let response = self
            .post(
                "/api/v1/beds",
                json!({ "room_id": room_id, "bed_number": bed_number }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Queue a patient and return the entry.
    pub async fn enqueue(&self, patient_id: &str, priority: i32, department: &str) -> Value {
        let response = self
            .post(
                "/api/v1/queue",
                json!({
                    "patient_id": patient_id,
                    "priority": priority,
                    "criteria": { "department": department }
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// A bed in cleaning with the given estimate; returns the bed id.
    ///
    /// Call before queueing other patients for the same department, or the
    /// new bed may go to one of them.
    pub async fn cleaning_bed(&self, room_id: &str, department: &str, minutes: u32) -> String {
        let n = next_suffix();
        let outgoing = format!("outgoing-{}", n);
        self.enqueue(&outgoing, 0, department).await;
        let bed = self.bed(room_id, &format!("C{}", n)).await;
        assert_eq!(bed["status"], "occupied");
        let bed_id = bed["id"].as_str().unwrap().to_string();

        let response = self
            .post(
                &format!("/api/v1/beds/{}/turnover", bed_id),
                json!({ "estimated_duration_minutes": minutes }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        bed_id
    }
}

/// Unique suffix for generated bed numbers and patient ids.
fn next_suffix() -> usize {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
