use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use super::{AuditError, AuditEvent, AuditFilter, AuditRecord, AuditStore};
use crate::error::EntityKind;

/// SQLite-backed audit store
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Open (or create) the audit database at `path`
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path).map_err(|e| AuditError::Database(e.to_string()))?;
        // The facility store may share the file.
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| AuditError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite audit store (useful for testing)
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory().map_err(|e| AuditError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                subject_kind TEXT,
                subject_id TEXT,
                patient_id TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_subject ON audit_events(subject_kind, subject_id);
            CREATE INDEX IF NOT EXISTS idx_audit_events_patient_id ON audit_events(patient_id);
            CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
            "#,
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Database("connection mutex poisoned".to_string()))
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(kind) = filter.subject_kind {
            conditions.push("subject_kind = ?".to_string());
            params.push(Box::new(kind.code()));
        }

        if let Some(ref subject_id) = filter.subject_id {
            conditions.push("subject_id = ?".to_string());
            params.push(Box::new(subject_id.clone()));
        }

        if let Some(ref patient_id) = filter.patient_id {
            conditions.push("patient_id = ?".to_string());
            params.push(Box::new(patient_id.clone()));
        }

        if !filter.event_types.is_empty() {
            let placeholders = vec!["?"; filter.event_types.len()].join(", ");
            conditions.push(format!("event_type IN ({})", placeholders));
            for event_type in &filter.event_types {
                params.push(Box::new(event_type.clone()));
            }
        }

        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?".to_string());
            params.push(Box::new(timestamp_text(from)));
        }

        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?".to_string());
            params.push(Box::new(timestamp_text(to)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

/// Fixed-width UTC text so lexical order matches time order.
fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, subject_kind, subject_id, patient_id, data) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                timestamp_text(&record.timestamp),
                record.event_type,
                record.subject_kind.map(|kind| kind.code()),
                record.subject_id,
                record.patient_id,
                data_json,
            ],
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.conn()?;

        let (where_clause, mut params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT id, timestamp, event_type, subject_kind, subject_id, patient_id, data \
             FROM audit_events {} \
             ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AuditError::Database(e.to_string()))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(|e| AuditError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, timestamp_str, event_type, subject_kind, subject_id, patient_id, data_json) =
                row_result.map_err(|e| AuditError::Database(e.to_string()))?;

            let subject_kind = subject_kind
                .map(|kind| kind.parse::<EntityKind>())
                .transpose()
                .map_err(AuditError::Database)?;

            let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            let data: AuditEvent = serde_json::from_str(&data_json)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            records.push(AuditRecord {
                id,
                timestamp,
                event_type,
                subject_kind,
                subject_id,
                patient_id,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| AuditError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteAuditStore {
        SqliteAuditStore::in_memory().unwrap()
    }

    fn record(event: AuditEvent) -> AuditRecord {
        AuditRecord::from_event(Utc::now(), event)
    }

    fn queued(entry_id: &str, patient_id: &str) -> AuditRecord {
        record(AuditEvent::PatientQueued {
            entry_id: entry_id.to_string(),
            patient_id: patient_id.to_string(),
            priority: 1,
            criteria: crate::queue::QueueCriteria::for_department("Cardiology"),
        })
    }

    fn turnover_started(bed_id: &str, patient_id: &str) -> AuditRecord {
        record(AuditEvent::TurnoverStarted {
            turnover_id: format!("t-{}", bed_id),
            bed_id: bed_id.to_string(),
            previous_patient_id: patient_id.to_string(),
            turnover_type: "standard".to_string(),
            estimated_minutes: 30,
        })
    }

    fn service_started() -> AuditRecord {
        record(AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        })
    }

    #[test]
    fn test_insert_and_query() {
        let store = create_test_store();

        let id = store.insert(&service_started()).unwrap();
        assert!(id > 0);

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].event_type, "service_started");
    }

    #[test]
    fn test_query_by_subject_and_patient() {
        let store = create_test_store();
        store.insert(&turnover_started("bed-1", "p-1")).unwrap();
        store.insert(&turnover_started("bed-2", "p-1")).unwrap();
        store.insert(&turnover_started("bed-3", "p-2")).unwrap();

        let by_bed = store
            .query(&AuditFilter::for_subject(EntityKind::Bed, "bed-1"))
            .unwrap();
        assert_eq!(by_bed.len(), 1);
        assert_eq!(by_bed[0].subject_kind, Some(EntityKind::Bed));
        assert_eq!(by_bed[0].subject_id.as_deref(), Some("bed-1"));

        let by_patient = store.query(&AuditFilter::for_patient("p-1")).unwrap();
        assert_eq!(by_patient.len(), 2);
    }

    #[test]
    fn test_query_by_subject_kind() {
        let store = create_test_store();
        store.insert(&service_started()).unwrap();
        store.insert(&turnover_started("bed-1", "p-1")).unwrap();
        store.insert(&queued("q-1", "p-1")).unwrap();
        store.insert(&queued("q-2", "p-2")).unwrap();

        let entries = AuditFilter::new().with_subject_kind(EntityKind::QueueEntry);
        assert_eq!(store.count(&entries).unwrap(), 2);

        // Same patient, but only the queue side of the story.
        let results = store
            .query(&AuditFilter::for_patient("p-1").with_subject_kind(EntityKind::QueueEntry))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subject_id.as_deref(), Some("q-1"));
        assert_eq!(results[0].subject_kind, Some(EntityKind::QueueEntry));

        let service = store.query(&AuditFilter::new().with_limit(10)).unwrap();
        let started = service
            .iter()
            .find(|r| r.event_type == "service_started")
            .unwrap();
        assert_eq!(started.subject_kind, None);
    }

    #[test]
    fn test_query_by_event_type() {
        let store = create_test_store();
        store.insert(&service_started()).unwrap();
        store.insert(&turnover_started("bed-1", "p-1")).unwrap();

        store.insert(&queued("q-1", "p-2")).unwrap();

        let results = store
            .query(&AuditFilter::new().with_event_types(["turnover_started"]))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].data, AuditEvent::TurnoverStarted { .. }));

        let filter = AuditFilter::new().with_event_types(["turnover_started", "patient_queued"]);
        assert_eq!(store.count(&filter).unwrap(), 2);
    }

    #[test]
    fn test_query_with_time_range() {
        let store = create_test_store();
        let now = Utc::now();

        let mut old = service_started();
        old.timestamp = now - chrono::Duration::hours(2);
        store.insert(&old).unwrap();

        let mut recent = service_started();
        recent.timestamp = now;
        store.insert(&recent).unwrap();

        let filter = AuditFilter::new().since(now - chrono::Duration::hours(1));
        assert_eq!(store.query(&filter).unwrap().len(), 1);
        assert_eq!(store.count(&filter).unwrap(), 1);

        let filter = AuditFilter::new().until(now - chrono::Duration::hours(1));
        assert_eq!(store.count(&filter).unwrap(), 1);
    }

    #[test]
    fn test_pagination_and_count() {
        let store = create_test_store();
        for i in 0..5 {
            store
                .insert(&turnover_started(&format!("bed-{}", i), "p"))
                .unwrap();
        }

        assert_eq!(store.count(&AuditFilter::new()).unwrap(), 5);
        assert_eq!(
            store
                .query(&AuditFilter::new().with_limit(2).with_offset(4))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("audit.db");

        let store = SqliteAuditStore::new(&db_path).unwrap();
        store.insert(&service_started()).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.query(&AuditFilter::new()).unwrap().len(), 1);
    }
}
