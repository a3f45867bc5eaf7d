//! Patient queue data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bed::{Bed, BedType};
use crate::error::ParseEnumError;

/// Queue entry status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Assigned,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Assigned => "assigned",
            QueueStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(QueueStatus::Waiting),
            "assigned" => Ok(QueueStatus::Assigned),
            "cancelled" => Ok(QueueStatus::Cancelled),
            other => Err(ParseEnumError::new("queue status", other)),
        }
    }
}

/// Constraints a bed must satisfy for a waiting patient.
///
/// Unset fields match any bed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed_type: Option<BedType>,
    #[serde(default)]
    pub requires_isolation: bool,
}

impl QueueCriteria {
    pub fn for_department(department: impl Into<String>) -> Self {
        Self {
            department: Some(department.into()),
            ..Default::default()
        }
    }

    pub fn with_bed_type(mut self, bed_type: BedType) -> Self {
        self.bed_type = Some(bed_type);
        self
    }

    pub fn with_isolation(mut self) -> Self {
        self.requires_isolation = true;
        self
    }

    /// Whether `bed` satisfies every specified constraint.
    /// Department comparison ignores case.
    pub fn matches(&self, bed: &Bed) -> bool {
        if let Some(ref department) = self.department {
            if !department.eq_ignore_ascii_case(&bed.department) {
                return false;
            }
        }
        if let Some(bed_type) = self.bed_type {
            if bed_type != bed.bed_type {
                return false;
            }
        }
        !self.requires_isolation || bed.isolation_capable
    }
}

/// A patient waiting for (or resolved from waiting for) a bed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientQueueEntry {
    pub id: String,
    pub patient_id: String,
    /// Higher is more urgent.
    pub priority: i32,
    pub criteria: QueueCriteria,
    pub queued_at: DateTime<Utc>,
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_bed_id: Option<String>,
    /// When the entry left `waiting`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Request to add a patient to the queue.
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
    pub patient_id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub criteria: QueueCriteria,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Filter for listing queue entries.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub status: Option<QueueStatus>,
    pub patient_id: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl QueueFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: QueueStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}
