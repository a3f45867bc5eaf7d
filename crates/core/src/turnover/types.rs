//! Core turnover data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::progress::{compute_progress, TurnoverProgress};
use crate::error::ParseEnumError;

/// Lifecycle of a cleaning cycle (bed or equipment).
///
/// ```text
/// Initiated -> Cleaning -> (Ready) -> Completed
///                 |
///                 v
///             Cancelled
/// ```
///
/// `Ready` is derived from the clock: a `Cleaning` record whose estimated
/// duration has elapsed reports `Ready` until it is completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TurnoverStatus {
    Initiated,
    Cleaning,
    Ready,
    Completed,
    Cancelled,
}

impl TurnoverStatus {
    /// Active records block a second turnover on the same bed or item.
    pub fn is_active(&self) -> bool {
        matches!(self, TurnoverStatus::Initiated | TurnoverStatus::Cleaning)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnoverStatus::Completed | TurnoverStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnoverStatus::Initiated => "initiated",
            TurnoverStatus::Cleaning => "cleaning",
            TurnoverStatus::Ready => "ready",
            TurnoverStatus::Completed => "completed",
            TurnoverStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TurnoverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnoverStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(TurnoverStatus::Initiated),
            "cleaning" => Ok(TurnoverStatus::Cleaning),
            "ready" => Ok(TurnoverStatus::Ready),
            "completed" => Ok(TurnoverStatus::Completed),
            "cancelled" => Ok(TurnoverStatus::Cancelled),
            other => Err(ParseEnumError::new("turnover status", other)),
        }
    }
}

/// Kind of cleaning performed during a turnover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TurnoverType {
    #[default]
    Standard,
    DeepClean,
    /// Terminal clean after an isolation patient.
    Isolation,
}

impl TurnoverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnoverType::Standard => "standard",
            TurnoverType::DeepClean => "deep_clean",
            TurnoverType::Isolation => "isolation",
        }
    }
}

impl fmt::Display for TurnoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnoverType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(TurnoverType::Standard),
            "deep_clean" => Ok(TurnoverType::DeepClean),
            "isolation" => Ok(TurnoverType::Isolation),
            other => Err(ParseEnumError::new("turnover type", other)),
        }
    }
}

/// Timing accessors shared by bed and equipment turnovers.
pub trait CleaningCycle {
    fn cleaning_start_time(&self) -> DateTime<Utc>;
    fn estimated_minutes(&self) -> u32;
    fn stored_status(&self) -> TurnoverStatus;

    /// Elapsed/remaining/progress at `now`.
    fn progress_at(&self, now: DateTime<Utc>) -> TurnoverProgress {
        compute_progress(self.cleaning_start_time(), self.estimated_minutes(), now)
    }

    /// Status as observed at `now`, with `Ready` derived for elapsed cycles.
    fn status_at(&self, now: DateTime<Utc>) -> TurnoverStatus {
        let status = self.stored_status();
        if status == TurnoverStatus::Cleaning && self.progress_at(now).is_complete() {
            TurnoverStatus::Ready
        } else {
            status
        }
    }

    fn estimated_completion_time(&self) -> DateTime<Utc> {
        self.cleaning_start_time() + Duration::minutes(i64::from(self.estimated_minutes()))
    }
}

/// A bed turnover record, one per discharge event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BedTurnover {
    /// Unique identifier (UUID).
    pub id: String,
    pub bed_id: String,
    /// Patient discharged from the bed.
    pub previous_patient_id: String,
    pub status: TurnoverStatus,
    pub turnover_type: TurnoverType,
    pub discharge_time: DateTime<Utc>,
    pub cleaning_start_time: DateTime<Utc>,
    pub estimated_cleaning_duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_completion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CleaningCycle for BedTurnover {
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

/// Request to start a bed turnover.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartTurnoverRequest {
    /// Patient being discharged; defaults to the bed's current occupant.
    #[serde(default)]
    pub previous_patient_id: Option<String>,
    /// Estimated cleaning duration; defaults to the configured value for the type.
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(default)]
    pub turnover_type: TurnoverType,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Filter for turnover history queries (bed or equipment).
#[derive(Debug, Clone, Default)]
pub struct TurnoverFilter {
    /// Bed id or equipment id.
    pub subject_id: Option<String>,
    /// Only `initiated`/`cleaning` records.
    pub active_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl TurnoverFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn active(mut self) -> Self {
        self.active_only = true;
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
