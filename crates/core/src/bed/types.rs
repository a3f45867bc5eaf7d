//! Bed and room data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// Bed status.
///
/// Allowed transitions:
///
/// ```text
/// available   -> occupied | reserved | maintenance
/// occupied    -> cleaning
/// cleaning    -> available | maintenance
/// maintenance -> available
/// reserved    -> available | maintenance
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Cleaning,
    Maintenance,
    Reserved,
}

impl BedStatus {
    pub const ALL: [BedStatus; 5] = [
        BedStatus::Available,
        BedStatus::Occupied,
        BedStatus::Cleaning,
        BedStatus::Maintenance,
        BedStatus::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BedStatus::Available => "available",
            BedStatus::Occupied => "occupied",
            BedStatus::Cleaning => "cleaning",
            BedStatus::Maintenance => "maintenance",
            BedStatus::Reserved => "reserved",
        }
    }

    /// Whether `self -> next` is in the transition table.
    pub fn can_transition_to(&self, next: BedStatus) -> bool {
        use BedStatus::*;
        matches!(
            (self, next),
            (Available, Occupied)
                | (Available, Reserved)
                | (Available, Maintenance)
                | (Occupied, Cleaning)
                | (Cleaning, Available)
                | (Cleaning, Maintenance)
                | (Maintenance, Available)
                | (Reserved, Available)
                | (Reserved, Maintenance)
        )
    }

    /// Targets reachable through an administrative status change.
    ///
    /// `occupied` is entered only through assignment and `cleaning` only
    /// through a turnover.
    pub fn is_admin_target(&self) -> bool {
        matches!(
            self,
            BedStatus::Available | BedStatus::Reserved | BedStatus::Maintenance
        )
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BedStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(BedStatus::Available),
            "occupied" => Ok(BedStatus::Occupied),
            "cleaning" => Ok(BedStatus::Cleaning),
            "maintenance" => Ok(BedStatus::Maintenance),
            "reserved" => Ok(BedStatus::Reserved),
            other => Err(ParseEnumError::new("bed status", other)),
        }
    }
}

/// Physical kind of bed, matched against queue criteria.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BedType {
    #[default]
    Standard,
    Icu,
    Pediatric,
    Maternity,
    Bariatric,
}

impl BedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BedType::Standard => "standard",
            BedType::Icu => "icu",
            BedType::Pediatric => "pediatric",
            BedType::Maternity => "maternity",
            BedType::Bariatric => "bariatric",
        }
    }
}

impl fmt::Display for BedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BedType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(BedType::Standard),
            "icu" => Ok(BedType::Icu),
            "pediatric" => Ok(BedType::Pediatric),
            "maternity" => Ok(BedType::Maternity),
            "bariatric" => Ok(BedType::Bariatric),
            other => Err(ParseEnumError::new("bed type", other)),
        }
    }
}

/// A room grouping beds and equipment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: String,
    pub room_number: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A bed, joined with the room fields queue criteria match against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bed {
    pub id: String,
    pub bed_number: String,
    pub room_id: String,
    pub room_number: String,
    pub department: String,
    pub bed_type: BedType,
    pub isolation_capable: bool,
    pub status: BedStatus,
    /// Present iff `status == Occupied`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<DateTime<Utc>>,
    /// Bumped on every write; used for optimistic concurrency.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to provision a room.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub room_number: String,
    pub department: String,
    #[serde(default)]
    pub floor: Option<i32>,
}

/// Request to provision a bed.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBedRequest {
    pub room_id: String,
    pub bed_number: String,
    #[serde(default)]
    pub bed_type: BedType,
    #[serde(default)]
    pub isolation_capable: bool,
}

/// Filter for listing beds.
#[derive(Debug, Clone, Default)]
pub struct BedFilter {
    pub status: Option<BedStatus>,
    pub room_id: Option<String>,
    /// Case-insensitive.
    pub department: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl BedFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: BedStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
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
