//! Equipment data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;
use crate::turnover::{CleaningCycle, TurnoverStatus, TurnoverType};

/// Equipment status.
///
/// ```text
/// in_use | available -> cleaning -> available
///                          |
///                          v
///                     maintenance -> available | in_use
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    InUse,
    Cleaning,
    Maintenance,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::InUse => "in_use",
            EquipmentStatus::Cleaning => "cleaning",
            EquipmentStatus::Maintenance => "maintenance",
        }
    }

    /// Whether a cleaning cycle may start from this status.
    pub fn can_start_cleaning(&self) -> bool {
        matches!(self, EquipmentStatus::InUse | EquipmentStatus::Available)
    }

    /// Whether `self -> next` is allowed as an administrative change.
    /// `cleaning` is entered and left only through a cleaning cycle.
    pub fn can_set_to(&self, next: EquipmentStatus) -> bool {
        use EquipmentStatus::*;
        matches!(
            (self, next),
            (Available, InUse)
                | (Available, Maintenance)
                | (InUse, Available)
                | (InUse, Maintenance)
                | (Maintenance, Available)
                | (Maintenance, InUse)
        )
    }
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(EquipmentStatus::Available),
            "in_use" => Ok(EquipmentStatus::InUse),
            "cleaning" => Ok(EquipmentStatus::Cleaning),
            "maintenance" => Ok(EquipmentStatus::Maintenance),
            other => Err(ParseEnumError::new("equipment status", other)),
        }
    }
}

/// A tracked equipment item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    /// Free-form kind, e.g. "infusion_pump".
    pub equipment_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub status: EquipmentStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cleaning cycle for an equipment item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentTurnover {
    pub id: String,
    pub equipment_id: String,
    pub status: TurnoverStatus,
    pub turnover_type: TurnoverType,
    /// When the item was released for cleaning.
    pub release_time: DateTime<Utc>,
    pub cleaning_start_time: DateTime<Utc>,
    pub estimated_cleaning_duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_completion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CleaningCycle for EquipmentTurnover {
    fn cleaning_start_time(&self) -> DateTime<Utc> {
        self.cleaning_start_time
    }

    fn estimated_minutes(&self) -> u32 {
        self.estimated_cleaning_duration_minutes
    }

    fn stored_status(&self) -> TurnoverStatus {
        self.status
    }
}

/// Request to provision an equipment item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEquipmentRequest {
    pub name: String,
    pub equipment_type: String,
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Request to start an equipment cleaning cycle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartCleaningRequest {
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(default)]
    pub turnover_type: TurnoverType,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Filter for listing equipment.
#[derive(Debug, Clone, Default)]
pub struct EquipmentFilter {
    pub status: Option<EquipmentStatus>,
    pub room_id: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl EquipmentFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: EquipmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
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
