//! SQLite-backed facility store.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{BedWrite, EquipmentWrite, FacilityStore, TurnoverClose};
use crate::bed::{Bed, BedFilter, BedStatus, Room};
use crate::equipment::{Equipment, EquipmentFilter, EquipmentTurnover};
use crate::error::{EntityKind, ParseEnumError, Result, TurnoverError};
use crate::queue::{PatientQueueEntry, QueueCriteria, QueueFilter, QueueStatus};
use crate::turnover::{BedTurnover, TurnoverFilter, TurnoverStatus};

const BED_COLUMNS: &str = "SELECT b.id, b.bed_number, b.room_id, r.room_number, r.department, \
     b.bed_type, b.isolation_capable, b.status, b.patient_id, b.admission_date, \
     b.discharge_date, b.version, b.created_at, b.updated_at \
     FROM beds b JOIN rooms r ON r.id = b.room_id";

const BED_TURNOVER_COLUMNS: &str = "SELECT id, bed_id, previous_patient_id, status, turnover_type, \
     discharge_time, cleaning_start_time, estimated_cleaning_duration_minutes, \
     actual_completion_time, cancel_reason, notes FROM bed_turnovers";

const EQUIPMENT_COLUMNS: &str = "SELECT id, name, equipment_type, room_id, status, version, \
     created_at, updated_at FROM equipment";

const EQUIPMENT_TURNOVER_COLUMNS: &str = "SELECT id, equipment_id, status, turnover_type, \
     release_time, cleaning_start_time, estimated_cleaning_duration_minutes, \
     actual_completion_time, cancel_reason, notes FROM equipment_turnovers";

const QUEUE_COLUMNS: &str = "SELECT id, patient_id, priority, criteria, queued_at, status, \
     assigned_bed_id, resolved_at, cancel_reason, notes FROM patient_queue";

/// SQLite-backed facility store.
pub struct SqliteFacilityStore {
    conn: Mutex<Connection>,
}

impl SqliteFacilityStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                room_number TEXT NOT NULL UNIQUE,
                department TEXT NOT NULL,
                floor INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS beds (
                id TEXT PRIMARY KEY,
                bed_number TEXT NOT NULL,
                room_id TEXT NOT NULL REFERENCES rooms(id),
                bed_type TEXT NOT NULL,
                isolation_capable INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                patient_id TEXT,
                admission_date TEXT,
                discharge_date TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (room_id, bed_number),
                CHECK ((status = 'occupied') = (patient_id IS NOT NULL))
            );

            CREATE INDEX IF NOT EXISTS idx_beds_status ON beds(status);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_beds_patient
                ON beds(patient_id) WHERE patient_id IS NOT NULL;

            CREATE TABLE IF NOT EXISTS bed_turnovers (
                id TEXT PRIMARY KEY,
                bed_id TEXT NOT NULL REFERENCES beds(id),
                previous_patient_id TEXT NOT NULL,
                status TEXT NOT NULL,
                turnover_type TEXT NOT NULL,
                discharge_time TEXT NOT NULL,
                cleaning_start_time TEXT NOT NULL,
                estimated_cleaning_duration_minutes INTEGER NOT NULL,
                actual_completion_time TEXT,
                cancel_reason TEXT,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_bed_turnovers_bed
                ON bed_turnovers(bed_id, cleaning_start_time);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_bed_turnovers_active
                ON bed_turnovers(bed_id) WHERE status IN ('initiated', 'cleaning');

            CREATE TABLE IF NOT EXISTS equipment (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                equipment_type TEXT NOT NULL,
                room_id TEXT REFERENCES rooms(id),
                status TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_equipment_room ON equipment(room_id);

            CREATE TABLE IF NOT EXISTS equipment_turnovers (
                id TEXT PRIMARY KEY,
                equipment_id TEXT NOT NULL REFERENCES equipment(id),
                status TEXT NOT NULL,
                turnover_type TEXT NOT NULL,
                release_time TEXT NOT NULL,
                cleaning_start_time TEXT NOT NULL,
                estimated_cleaning_duration_minutes INTEGER NOT NULL,
                actual_completion_time TEXT,
                cancel_reason TEXT,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_equipment_turnovers_item
                ON equipment_turnovers(equipment_id, cleaning_start_time);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_equipment_turnovers_active
                ON equipment_turnovers(equipment_id) WHERE status IN ('initiated', 'cleaning');

            CREATE TABLE IF NOT EXISTS patient_queue (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                criteria TEXT NOT NULL,
                queued_at TEXT NOT NULL,
                status TEXT NOT NULL,
                assigned_bed_id TEXT REFERENCES beds(id),
                resolved_at TEXT,
                cancel_reason TEXT,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_patient_queue_order
                ON patient_queue(status, priority DESC, queued_at ASC);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_patient_queue_waiting
                ON patient_queue(patient_id) WHERE status = 'waiting';
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TurnoverError::Database("connection mutex poisoned".to_string()))
    }

    fn build_bed_where(filter: &BedFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("b.status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(ref room_id) = filter.room_id {
            conditions.push("b.room_id = ?");
            params.push(Box::new(room_id.clone()));
        }

        if let Some(ref department) = filter.department {
            conditions.push("r.department = ? COLLATE NOCASE");
            params.push(Box::new(department.clone()));
        }

        (where_clause(&conditions), params)
    }

    fn build_equipment_where(filter: &EquipmentFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(ref room_id) = filter.room_id {
            conditions.push("room_id = ?");
            params.push(Box::new(room_id.clone()));
        }

        (where_clause(&conditions), params)
    }

    fn build_queue_where(filter: &QueueFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(ref patient_id) = filter.patient_id {
            conditions.push("patient_id = ?");
            params.push(Box::new(patient_id.clone()));
        }

        (where_clause(&conditions), params)
    }

    fn build_turnover_where(
        filter: &TurnoverFilter,
        subject_column: &'static str,
    ) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let subject_condition = format!("{} = ?", subject_column);

        if let Some(ref subject_id) = filter.subject_id {
            conditions.push(subject_condition.as_str());
            params.push(Box::new(subject_id.clone()));
        }

        if filter.active_only {
            conditions.push("status IN ('initiated', 'cleaning')");
        }

        (where_clause(&conditions), params)
    }

    fn row_to_room(row: &rusqlite::Row) -> rusqlite::Result<Room> {
        Ok(Room {
            id: row.get(0)?,
            room_number: row.get(1)?,
            department: row.get(2)?,
            floor: row.get(3)?,
            created_at: parse_ts(4, row.get(4)?)?,
        })
    }

    fn row_to_bed(row: &rusqlite::Row) -> rusqlite::Result<Bed> {
        Ok(Bed {
            id: row.get(0)?,
            bed_number: row.get(1)?,
            room_id: row.get(2)?,
            room_number: row.get(3)?,
            department: row.get(4)?,
            bed_type: parse_enum(5, row.get(5)?)?,
            isolation_capable: row.get(6)?,
            status: parse_enum(7, row.get(7)?)?,
            patient_id: row.get(8)?,
            admission_date: parse_opt_ts(9, row.get(9)?)?,
            discharge_date: parse_opt_ts(10, row.get(10)?)?,
            version: row.get(11)?,
            created_at: parse_ts(12, row.get(12)?)?,
            updated_at: parse_ts(13, row.get(13)?)?,
        })
    }

    fn row_to_bed_turnover(row: &rusqlite::Row) -> rusqlite::Result<BedTurnover> {
        Ok(BedTurnover {
            id: row.get(0)?,
            bed_id: row.get(1)?,
            previous_patient_id: row.get(2)?,
            status: parse_enum(3, row.get(3)?)?,
            turnover_type: parse_enum(4, row.get(4)?)?,
            discharge_time: parse_ts(5, row.get(5)?)?,
            cleaning_start_time: parse_ts(6, row.get(6)?)?,
            estimated_cleaning_duration_minutes: row.get(7)?,
            actual_completion_time: parse_opt_ts(8, row.get(8)?)?,
            cancel_reason: row.get(9)?,
            notes: row.get(10)?,
        })
    }

    fn row_to_equipment(row: &rusqlite::Row) -> rusqlite::Result<Equipment> {
        Ok(Equipment {
            id: row.get(0)?,
            name: row.get(1)?,
            equipment_type: row.get(2)?,
            room_id: row.get(3)?,
            status: parse_enum(4, row.get(4)?)?,
            version: row.get(5)?,
            created_at: parse_ts(6, row.get(6)?)?,
            updated_at: parse_ts(7, row.get(7)?)?,
        })
    }

    fn row_to_equipment_turnover(row: &rusqlite::Row) -> rusqlite::Result<EquipmentTurnover> {
        Ok(EquipmentTurnover {
            id: row.get(0)?,
            equipment_id: row.get(1)?,
            status: parse_enum(2, row.get(2)?)?,
            turnover_type: parse_enum(3, row.get(3)?)?,
            release_time: parse_ts(4, row.get(4)?)?,
            cleaning_start_time: parse_ts(5, row.get(5)?)?,
            estimated_cleaning_duration_minutes: row.get(6)?,
            actual_completion_time: parse_opt_ts(7, row.get(7)?)?,
            cancel_reason: row.get(8)?,
            notes: row.get(9)?,
        })
    }

    fn row_to_queue_entry(row: &rusqlite::Row) -> rusqlite::Result<PatientQueueEntry> {
        let criteria_json: String = row.get(3)?;
        let criteria: QueueCriteria = serde_json::from_str(&criteria_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        Ok(PatientQueueEntry {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            priority: row.get(2)?,
            criteria,
            queued_at: parse_ts(4, row.get(4)?)?,
            status: parse_enum(5, row.get(5)?)?,
            assigned_bed_id: row.get(6)?,
            resolved_at: parse_opt_ts(7, row.get(7)?)?,
            cancel_reason: row.get(8)?,
            notes: row.get(9)?,
        })
    }

    fn select_bed(conn: &Connection, id: &str) -> Result<Option<Bed>> {
        let sql = format!("{} WHERE b.id = ?1", BED_COLUMNS);
        Ok(conn.query_row(&sql, [id], Self::row_to_bed).optional()?)
    }

    fn select_equipment(conn: &Connection, id: &str) -> Result<Option<Equipment>> {
        let sql = format!("{} WHERE id = ?1", EQUIPMENT_COLUMNS);
        Ok(conn
            .query_row(&sql, [id], Self::row_to_equipment)
            .optional()?)
    }

    fn select_queue_entry(conn: &Connection, id: &str) -> Result<Option<PatientQueueEntry>> {
        let sql = format!("{} WHERE id = ?1", QUEUE_COLUMNS);
        Ok(conn
            .query_row(&sql, [id], Self::row_to_queue_entry)
            .optional()?)
    }

    fn apply_bed_write(conn: &Connection, write: &BedWrite) -> Result<()> {
        let changed = conn
            .execute(
                "UPDATE beds SET status = ?1, patient_id = ?2, admission_date = ?3, \
                 discharge_date = ?4, updated_at = ?5, version = version + 1 \
                 WHERE id = ?6 AND version = ?7",
                params![
                    write.status.as_str(),
                    write.patient_id,
                    opt_ts(&write.admission_date),
                    opt_ts(&write.discharge_date),
                    ts(&write.updated_at),
                    write.bed_id,
                    write.expected_version,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TurnoverError::conflict(&write.bed_id, "patient already occupies another bed")
                } else {
                    e.into()
                }
            })?;

        if changed == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM beds WHERE id = ?1)",
                [&write.bed_id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                TurnoverError::conflict(&write.bed_id, "bed was modified concurrently")
            } else {
                TurnoverError::not_found(EntityKind::Bed, &write.bed_id)
            });
        }

        Ok(())
    }

    fn apply_equipment_write(conn: &Connection, write: &EquipmentWrite) -> Result<()> {
        let changed = conn.execute(
            "UPDATE equipment SET status = ?1, updated_at = ?2, version = version + 1 \
             WHERE id = ?3 AND version = ?4",
            params![
                write.status.as_str(),
                ts(&write.updated_at),
                write.equipment_id,
                write.expected_version,
            ],
        )?;

        if changed == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM equipment WHERE id = ?1)",
                [&write.equipment_id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                TurnoverError::conflict(&write.equipment_id, "equipment was modified concurrently")
            } else {
                TurnoverError::not_found(EntityKind::Equipment, &write.equipment_id)
            });
        }

        Ok(())
    }

    /// Close an active turnover row in `table`.
    fn apply_close(conn: &Connection, table: &str, close: &TurnoverClose) -> Result<()> {
        let completion = (close.status == TurnoverStatus::Completed).then(|| ts(&close.at));
        let sql = format!(
            "UPDATE {} SET status = ?1, actual_completion_time = ?2, cancel_reason = ?3 \
             WHERE id = ?4 AND status IN ('initiated', 'cleaning')",
            table
        );
        let changed = conn.execute(
            &sql,
            params![
                close.status.as_str(),
                completion,
                close.cancel_reason,
                close.turnover_id,
            ],
        )?;

        if changed == 0 {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Turnover,
                &close.turnover_id,
                "closed",
                close_verb(close.status),
            ));
        }

        Ok(())
    }

    fn query_list<T>(
        &self,
        sql: &str,
        params: Vec<Box<dyn rusqlite::ToSql>>,
        map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), map)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}

impl FacilityStore for SqliteFacilityStore {
    fn create_room(&self, room: &Room) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO rooms (id, room_number, department, floor, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                room.id,
                room.room_number,
                room.department,
                room.floor,
                ts(&room.created_at),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                TurnoverError::Validation(format!("room {} already exists", room.room_number))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    fn get_room(&self, id: &str) -> Result<Option<Room>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, room_number, department, floor, created_at FROM rooms WHERE id = ?1",
                [id],
                Self::row_to_room,
            )
            .optional()?)
    }

    fn list_rooms(&self) -> Result<Vec<Room>> {
        self.query_list(
            "SELECT id, room_number, department, floor, created_at FROM rooms \
             ORDER BY room_number ASC",
            Vec::new(),
            Self::row_to_room,
        )
    }

    fn insert_bed(&self, bed: &Bed) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO beds (id, bed_number, room_id, bed_type, isolation_capable, status, \
             patient_id, admission_date, discharge_date, version, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                bed.id,
                bed.bed_number,
                bed.room_id,
                bed.bed_type.as_str(),
                bed.isolation_capable,
                bed.status.as_str(),
                bed.patient_id,
                opt_ts(&bed.admission_date),
                opt_ts(&bed.discharge_date),
                bed.version,
                ts(&bed.created_at),
                ts(&bed.updated_at),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                TurnoverError::Validation(format!(
                    "bed {} already exists in room {}",
                    bed.bed_number, bed.room_id
                ))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    fn get_bed(&self, id: &str) -> Result<Option<Bed>> {
        let conn = self.conn()?;
        Self::select_bed(&conn, id)
    }

    fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>> {
        let (where_clause, mut params) = Self::build_bed_where(filter);
        let sql = format!(
            "{} {} ORDER BY r.room_number ASC, b.bed_number ASC LIMIT ? OFFSET ?",
            BED_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        self.query_list(&sql, params, Self::row_to_bed)
    }

    fn count_beds_by_status(&self) -> Result<Vec<(BedStatus, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM beds GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((parse_enum::<BedStatus>(0, row.get(0)?)?, row.get(1)?))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    fn write_bed(&self, write: &BedWrite) -> Result<Bed> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::apply_bed_write(&tx, write)?;
        let bed = Self::select_bed(&tx, &write.bed_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::Bed, &write.bed_id))?;
        tx.commit()?;
        Ok(bed)
    }

    fn begin_bed_turnover(&self, release: &BedWrite, turnover: &BedTurnover) -> Result<Bed> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        Self::apply_bed_write(&tx, release)?;

        tx.execute(
            "INSERT INTO bed_turnovers (id, bed_id, previous_patient_id, status, turnover_type, \
             discharge_time, cleaning_start_time, estimated_cleaning_duration_minutes, \
             actual_completion_time, cancel_reason, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                turnover.id,
                turnover.bed_id,
                turnover.previous_patient_id,
                turnover.status.as_str(),
                turnover.turnover_type.as_str(),
                ts(&turnover.discharge_time),
                ts(&turnover.cleaning_start_time),
                turnover.estimated_cleaning_duration_minutes,
                opt_ts(&turnover.actual_completion_time),
                turnover.cancel_reason,
                turnover.notes,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                TurnoverError::invalid_transition(
                    EntityKind::Bed,
                    &turnover.bed_id,
                    "cleaning",
                    "start turnover on",
                )
            } else {
                e.into()
            }
        })?;

        let bed = Self::select_bed(&tx, &release.bed_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::Bed, &release.bed_id))?;
        tx.commit()?;
        Ok(bed)
    }

    fn close_bed_turnover(
        &self,
        close: &TurnoverClose,
        bed: &BedWrite,
    ) -> Result<(Bed, BedTurnover)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        Self::apply_close(&tx, "bed_turnovers", close)?;
        Self::apply_bed_write(&tx, bed)?;

        let updated = Self::select_bed(&tx, &bed.bed_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::Bed, &bed.bed_id))?;
        let sql = format!("{} WHERE id = ?1", BED_TURNOVER_COLUMNS);
        let turnover = tx.query_row(&sql, [&close.turnover_id], Self::row_to_bed_turnover)?;

        tx.commit()?;
        Ok((updated, turnover))
    }

    fn active_bed_turnover(&self, bed_id: &str) -> Result<Option<BedTurnover>> {
        let conn = self.conn()?;
        let sql = format!(
            "{} WHERE bed_id = ?1 AND status IN ('initiated', 'cleaning')",
            BED_TURNOVER_COLUMNS
        );
        Ok(conn
            .query_row(&sql, [bed_id], Self::row_to_bed_turnover)
            .optional()?)
    }

    fn list_bed_turnovers(&self, filter: &TurnoverFilter) -> Result<Vec<BedTurnover>> {
        let (where_clause, mut params) = Self::build_turnover_where(filter, "bed_id");
        let sql = format!(
            "{} {} ORDER BY cleaning_start_time DESC LIMIT ? OFFSET ?",
            BED_TURNOVER_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        self.query_list(&sql, params, Self::row_to_bed_turnover)
    }

    fn insert_equipment(&self, equipment: &Equipment) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO equipment (id, name, equipment_type, room_id, status, version, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                equipment.id,
                equipment.name,
                equipment.equipment_type,
                equipment.room_id,
                equipment.status.as_str(),
                equipment.version,
                ts(&equipment.created_at),
                ts(&equipment.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_equipment(&self, id: &str) -> Result<Option<Equipment>> {
        let conn = self.conn()?;
        Self::select_equipment(&conn, id)
    }

    fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        let (where_clause, mut params) = Self::build_equipment_where(filter);
        let sql = format!(
            "{} {} ORDER BY name ASC, id ASC LIMIT ? OFFSET ?",
            EQUIPMENT_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        self.query_list(&sql, params, Self::row_to_equipment)
    }

    fn write_equipment(&self, write: &EquipmentWrite) -> Result<Equipment> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::apply_equipment_write(&tx, write)?;
        let equipment = Self::select_equipment(&tx, &write.equipment_id)?.ok_or_else(|| {
            TurnoverError::not_found(EntityKind::Equipment, &write.equipment_id)
        })?;
        tx.commit()?;
        Ok(equipment)
    }

    fn begin_equipment_turnover(
        &self,
        release: &EquipmentWrite,
        turnover: &EquipmentTurnover,
    ) -> Result<Equipment> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        Self::apply_equipment_write(&tx, release)?;

        tx.execute(
            "INSERT INTO equipment_turnovers (id, equipment_id, status, turnover_type, \
             release_time, cleaning_start_time, estimated_cleaning_duration_minutes, \
             actual_completion_time, cancel_reason, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                turnover.id,
                turnover.equipment_id,
                turnover.status.as_str(),
                turnover.turnover_type.as_str(),
                ts(&turnover.release_time),
                ts(&turnover.cleaning_start_time),
                turnover.estimated_cleaning_duration_minutes,
                opt_ts(&turnover.actual_completion_time),
                turnover.cancel_reason,
                turnover.notes,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                TurnoverError::invalid_transition(
                    EntityKind::Equipment,
                    &turnover.equipment_id,
                    "cleaning",
                    "start cleaning on",
                )
            } else {
                e.into()
            }
        })?;

        let equipment = Self::select_equipment(&tx, &release.equipment_id)?.ok_or_else(|| {
            TurnoverError::not_found(EntityKind::Equipment, &release.equipment_id)
        })?;
        tx.commit()?;
        Ok(equipment)
    }

    fn close_equipment_turnover(
        &self,
        close: &TurnoverClose,
        equipment: &EquipmentWrite,
    ) -> Result<(Equipment, EquipmentTurnover)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        Self::apply_close(&tx, "equipment_turnovers", close)?;
        Self::apply_equipment_write(&tx, equipment)?;

        let updated = Self::select_equipment(&tx, &equipment.equipment_id)?.ok_or_else(|| {
            TurnoverError::not_found(EntityKind::Equipment, &equipment.equipment_id)
        })?;
        let sql = format!("{} WHERE id = ?1", EQUIPMENT_TURNOVER_COLUMNS);
        let turnover =
            tx.query_row(&sql, [&close.turnover_id], Self::row_to_equipment_turnover)?;

        tx.commit()?;
        Ok((updated, turnover))
    }

    fn active_equipment_turnover(&self, equipment_id: &str) -> Result<Option<EquipmentTurnover>> {
        let conn = self.conn()?;
        let sql = format!(
            "{} WHERE equipment_id = ?1 AND status IN ('initiated', 'cleaning')",
            EQUIPMENT_TURNOVER_COLUMNS
        );
        Ok(conn
            .query_row(&sql, [equipment_id], Self::row_to_equipment_turnover)
            .optional()?)
    }

    fn list_equipment_turnovers(&self, filter: &TurnoverFilter) -> Result<Vec<EquipmentTurnover>> {
        let (where_clause, mut params) = Self::build_turnover_where(filter, "equipment_id");
        let sql = format!(
            "{} {} ORDER BY cleaning_start_time DESC LIMIT ? OFFSET ?",
            EQUIPMENT_TURNOVER_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        self.query_list(&sql, params, Self::row_to_equipment_turnover)
    }

    fn insert_queue_entry(&self, entry: &PatientQueueEntry) -> Result<()> {
        let criteria_json = serde_json::to_string(&entry.criteria)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO patient_queue (id, patient_id, priority, criteria, queued_at, status, \
             assigned_bed_id, resolved_at, cancel_reason, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id,
                entry.patient_id,
                entry.priority,
                criteria_json,
                ts(&entry.queued_at),
                entry.status.as_str(),
                entry.assigned_bed_id,
                opt_ts(&entry.resolved_at),
                entry.cancel_reason,
                entry.notes,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                TurnoverError::Validation(format!(
                    "patient {} already has a waiting queue entry",
                    entry.patient_id
                ))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    fn get_queue_entry(&self, id: &str) -> Result<Option<PatientQueueEntry>> {
        let conn = self.conn()?;
        Self::select_queue_entry(&conn, id)
    }

    fn list_queue_entries(&self, filter: &QueueFilter) -> Result<Vec<PatientQueueEntry>> {
        let (where_clause, mut params) = Self::build_queue_where(filter);
        let sql = format!(
            "{} {} ORDER BY priority DESC, queued_at ASC, id ASC LIMIT ? OFFSET ?",
            QUEUE_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        self.query_list(&sql, params, Self::row_to_queue_entry)
    }

    fn count_queue_entries(&self, filter: &QueueFilter) -> Result<i64> {
        let conn = self.conn()?;
        let (where_clause, params) = Self::build_queue_where(filter);
        let sql = format!("SELECT COUNT(*) FROM patient_queue {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        Ok(conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?)
    }

    fn waiting_queue_entries(&self) -> Result<Vec<PatientQueueEntry>> {
        let sql = format!("{} WHERE status = 'waiting'", QUEUE_COLUMNS);
        self.query_list(&sql, Vec::new(), Self::row_to_queue_entry)
    }

    fn cancel_queue_entry(
        &self,
        id: &str,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE patient_queue SET status = 'cancelled', cancel_reason = ?1, resolved_at = ?2 \
             WHERE id = ?3 AND status = 'waiting'",
            params![reason, ts(&at), id],
        )?;
        Ok(changed > 0)
    }

    fn assign_from_queue(
        &self,
        bed: &BedWrite,
        entry_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(Bed, PatientQueueEntry)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let entry = Self::select_queue_entry(&tx, entry_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::QueueEntry, entry_id))?;
        if bed.patient_id.as_deref() != Some(entry.patient_id.as_str()) {
            return Err(TurnoverError::Validation(format!(
                "bed write does not carry patient {} of queue entry {}",
                entry.patient_id, entry_id
            )));
        }

        let changed = tx.execute(
            "UPDATE patient_queue SET status = ?1, assigned_bed_id = ?2, resolved_at = ?3 \
             WHERE id = ?4 AND status = 'waiting'",
            params![QueueStatus::Assigned.as_str(), bed.bed_id, ts(&at), entry_id],
        )?;
        if changed == 0 {
            return Err(TurnoverError::conflict(
                &bed.bed_id,
                format!("queue entry {} is no longer waiting", entry_id),
            ));
        }

        Self::apply_bed_write(&tx, bed)?;

        let updated_bed = Self::select_bed(&tx, &bed.bed_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::Bed, &bed.bed_id))?;
        let updated_entry = Self::select_queue_entry(&tx, entry_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::QueueEntry, entry_id))?;

        tx.commit()?;
        Ok((updated_bed, updated_entry))
    }
}

fn where_clause(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

fn close_verb(status: TurnoverStatus) -> &'static str {
    match status {
        TurnoverStatus::Cancelled => "cancel",
        _ => "complete",
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn opt_ts(dt: &Option<DateTime<Utc>>) -> Option<String> {
    dt.as_ref().map(ts)
}

fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_ts(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_ts(idx, v)).transpose()
}

fn parse_enum<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .parse()
        .map_err(|e: ParseEnumError| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
}
