use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EntityKind;
use crate::queue::QueueCriteria;

/// Who closed a cleaning cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletedBy {
    /// An explicit completion request.
    Staff,
    /// The periodic sweeper.
    Sweeper,
}

impl CompletedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletedBy::Staff => "staff",
            CompletedBy::Sweeper => "sweeper",
        }
    }
}

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Provisioning
    RoomProvisioned {
        room_id: String,
        room_number: String,
        department: String,
    },
    BedProvisioned {
        bed_id: String,
        room_id: String,
        bed_number: String,
        bed_type: String,
    },
    EquipmentProvisioned {
        equipment_id: String,
        name: String,
        equipment_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
    },

    // Administrative status changes
    BedStatusChanged {
        bed_id: String,
        from_status: String,
        to_status: String,
    },
    EquipmentStatusChanged {
        equipment_id: String,
        from_status: String,
        to_status: String,
    },

    // Bed turnover lifecycle
    TurnoverStarted {
        turnover_id: String,
        bed_id: String,
        previous_patient_id: String,
        turnover_type: String,
        estimated_minutes: u32,
    },
    TurnoverCompleted {
        turnover_id: String,
        bed_id: String,
        /// Minutes between cleaning start and completion
        actual_minutes: f64,
        completed_by: CompletedBy,
    },
    TurnoverCancelled {
        turnover_id: String,
        bed_id: String,
        reason: String,
    },

    // Equipment cleaning lifecycle
    EquipmentCleaningStarted {
        turnover_id: String,
        equipment_id: String,
        turnover_type: String,
        estimated_minutes: u32,
    },
    EquipmentCleaningCompleted {
        turnover_id: String,
        equipment_id: String,
        actual_minutes: f64,
        completed_by: CompletedBy,
    },
    EquipmentCleaningCancelled {
        turnover_id: String,
        equipment_id: String,
        reason: String,
    },

    // Queue and assignment
    PatientQueued {
        entry_id: String,
        patient_id: String,
        priority: i32,
        criteria: QueueCriteria,
    },
    QueueEntryCancelled {
        entry_id: String,
        patient_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    PatientAssigned {
        entry_id: String,
        patient_id: String,
        bed_id: String,
        priority: i32,
        /// Minutes between queueing and assignment
        waited_minutes: f64,
    },
    /// A candidate lost a race and was skipped.
    AssignmentConflict {
        bed_id: String,
        entry_id: String,
        patient_id: String,
        reason: String,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::RoomProvisioned { .. } => "room_provisioned",
            Self::BedProvisioned { .. } => "bed_provisioned",
            Self::EquipmentProvisioned { .. } => "equipment_provisioned",
            Self::BedStatusChanged { .. } => "bed_status_changed",
            Self::EquipmentStatusChanged { .. } => "equipment_status_changed",
            Self::TurnoverStarted { .. } => "turnover_started",
            Self::TurnoverCompleted { .. } => "turnover_completed",
            Self::TurnoverCancelled { .. } => "turnover_cancelled",
            Self::EquipmentCleaningStarted { .. } => "equipment_cleaning_started",
            Self::EquipmentCleaningCompleted { .. } => "equipment_cleaning_completed",
            Self::EquipmentCleaningCancelled { .. } => "equipment_cleaning_cancelled",
            Self::PatientQueued { .. } => "patient_queued",
            Self::QueueEntryCancelled { .. } => "queue_entry_cancelled",
            Self::PatientAssigned { .. } => "patient_assigned",
            Self::AssignmentConflict { .. } => "assignment_conflict",
        }
    }

    /// The room, bed, equipment item or queue entry the event is about
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
            Self::RoomProvisioned { room_id, .. } => Some(room_id),
            Self::BedProvisioned { bed_id, .. }
            | Self::BedStatusChanged { bed_id, .. }
            | Self::TurnoverStarted { bed_id, .. }
            | Self::TurnoverCompleted { bed_id, .. }
            | Self::TurnoverCancelled { bed_id, .. }
            | Self::PatientAssigned { bed_id, .. }
            | Self::AssignmentConflict { bed_id, .. } => Some(bed_id),
            Self::EquipmentProvisioned { equipment_id, .. }
            | Self::EquipmentStatusChanged { equipment_id, .. }
            | Self::EquipmentCleaningStarted { equipment_id, .. }
            | Self::EquipmentCleaningCompleted { equipment_id, .. }
            | Self::EquipmentCleaningCancelled { equipment_id, .. } => Some(equipment_id),
            Self::PatientQueued { entry_id, .. } | Self::QueueEntryCancelled { entry_id, .. } => {
                Some(entry_id)
            }
        }
    }

    /// Kind of entity `subject_id` refers to
    pub fn subject_kind(&self) -> Option<EntityKind> {
        match self {
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
            Self::RoomProvisioned { .. } => Some(EntityKind::Room),
            Self::BedProvisioned { .. }
            | Self::BedStatusChanged { .. }
            | Self::TurnoverStarted { .. }
            | Self::TurnoverCompleted { .. }
            | Self::TurnoverCancelled { .. }
            | Self::PatientAssigned { .. }
            | Self::AssignmentConflict { .. } => Some(EntityKind::Bed),
            Self::EquipmentProvisioned { .. }
            | Self::EquipmentStatusChanged { .. }
            | Self::EquipmentCleaningStarted { .. }
            | Self::EquipmentCleaningCompleted { .. }
            | Self::EquipmentCleaningCancelled { .. } => Some(EntityKind::Equipment),
            Self::PatientQueued { .. } | Self::QueueEntryCancelled { .. } => {
                Some(EntityKind::QueueEntry)
            }
        }
    }

    /// Extract patient_id if this event concerns a patient
    pub fn patient_id(&self) -> Option<&str> {
        match self {
            Self::TurnoverStarted {
                previous_patient_id,
                ..
            } => Some(previous_patient_id),
            Self::PatientQueued { patient_id, .. }
            | Self::QueueEntryCancelled { patient_id, .. }
            | Self::PatientAssigned { patient_id, .. }
            | Self::AssignmentConflict { patient_id, .. } => Some(patient_id),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub subject_kind: Option<EntityKind>,
    pub subject_id: Option<String>,
    pub patient_id: Option<String>,
    pub data: AuditEvent,
}

impl AuditRecord {
    /// Unsaved record for `event`, with its lookup keys extracted.
    pub fn from_event(timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id: 0,
            timestamp,
            event_type: event.event_type().to_string(),
            subject_kind: event.subject_kind(),
            subject_id: event.subject_id().map(String::from),
            patient_id: event.patient_id().map(String::from),
            data: event,
        }
    }
}
