//! Status reports with time remaining, as served to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{BedTurnover, CleaningCycle, TurnoverStatus, TurnoverType};
use crate::bed::{Bed, BedStatus};
use crate::equipment::{Equipment, EquipmentStatus, EquipmentTurnover};

/// The active cleaning cycle observed at a point in time.
///
/// Minutes and percentages are rounded to one decimal place.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CycleReport {
    /// `cleaning`, or `ready` once the estimate has elapsed.
    pub process_status: TurnoverStatus,
    pub turnover_id: String,
    pub turnover_type: TurnoverType,
    pub cleaning_start_time: DateTime<Utc>,
    pub estimated_completion_time: DateTime<Utc>,
    pub elapsed_minutes: f64,
    pub time_remaining_minutes: f64,
    pub progress_percentage: f64,
}

impl CycleReport {
    fn observe<C: CleaningCycle>(
        cycle: &C,
        turnover_id: &str,
        turnover_type: TurnoverType,
        now: DateTime<Utc>,
    ) -> Self {
        let progress = cycle.progress_at(now).rounded();
        Self {
            process_status: cycle.status_at(now),
            turnover_id: turnover_id.to_string(),
            turnover_type,
            cleaning_start_time: cycle.cleaning_start_time(),
            estimated_completion_time: cycle.estimated_completion_time(),
            elapsed_minutes: progress.elapsed_minutes,
            time_remaining_minutes: progress.time_remaining_minutes,
            progress_percentage: progress.progress_percentage,
        }
    }
}

/// Bed status with time remaining on its turnover, if one is active.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BedStatusReport {
    pub bed_id: String,
    pub bed_number: String,
    pub room_number: String,
    pub department: String,
    pub current_status: BedStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(flatten)]
    pub cycle: Option<CycleReport>,
}

impl BedStatusReport {
    pub fn new(bed: &Bed, active: Option<&BedTurnover>, now: DateTime<Utc>) -> Self {
        Self {
            bed_id: bed.id.clone(),
            bed_number: bed.bed_number.clone(),
            room_number: bed.room_number.clone(),
            department: bed.department.clone(),
            current_status: bed.status,
            patient_id: bed.patient_id.clone(),
            cycle: active.map(|t| CycleReport::observe(t, &t.id, t.turnover_type, now)),
        }
    }
}

/// Equipment status with time remaining on its cleaning cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EquipmentStatusReport {
    pub equipment_id: String,
    pub name: String,
    pub equipment_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub current_status: EquipmentStatus,
    #[serde(flatten)]
    pub cycle: Option<CycleReport>,
}

impl EquipmentStatusReport {
    pub fn new(
        equipment: &Equipment,
        active: Option<&EquipmentTurnover>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            equipment_id: equipment.id.clone(),
            name: equipment.name.clone(),
            equipment_type: equipment.equipment_type.clone(),
            room_id: equipment.room_id.clone(),
            current_status: equipment.status,
            cycle: active.map(|t| CycleReport::observe(t, &t.id, t.turnover_type, now)),
        }
    }
}
