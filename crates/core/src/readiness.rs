//! Room-level readiness across beds and equipment.
//!
//! Informational only. Bed assignment never waits on equipment.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bed::{BedFilter, BedStatus};
use crate::equipment::{EquipmentFilter, EquipmentStatus};
use crate::error::{EntityKind, Result, TurnoverError};
use crate::store::FacilityStore;
use crate::turnover::{CleaningCycle, TurnoverStatus};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoomReadiness {
    pub room_id: String,
    pub room_number: String,
    /// Every active bed and equipment turnover in the room has reached
    /// `ready` at the time of the check.
    pub ready: bool,
    pub pending_beds: Vec<String>,
    pub pending_equipment: Vec<String>,
}

/// True while a cycle observed at `now` has not reached `ready`.
fn still_cleaning<C: CleaningCycle>(cycle: Option<&C>, now: DateTime<Utc>) -> bool {
    match cycle {
        Some(cycle) => matches!(
            cycle.status_at(now),
            TurnoverStatus::Initiated | TurnoverStatus::Cleaning
        ),
        None => true,
    }
}

pub fn room_readiness(
    store: &dyn FacilityStore,
    room_id: &str,
    now: DateTime<Utc>,
) -> Result<RoomReadiness> {
    let room = store
        .get_room(room_id)?
        .ok_or_else(|| TurnoverError::not_found(EntityKind::Room, room_id))?;

    let mut pending_beds = Vec::new();
    for bed in store.list_beds(
        &BedFilter::new()
            .with_room(room_id)
            .with_status(BedStatus::Cleaning)
            .with_limit(i64::MAX),
    )? {
        let active = store.active_bed_turnover(&bed.id)?;
        if still_cleaning(active.as_ref(), now) {
            pending_beds.push(bed.id);
        }
    }

    let mut pending_equipment = Vec::new();
    for equipment in store.list_equipment(
        &EquipmentFilter::new()
            .with_room(room_id)
            .with_status(EquipmentStatus::Cleaning)
            .with_limit(i64::MAX),
    )? {
        let active = store.active_equipment_turnover(&equipment.id)?;
        if still_cleaning(active.as_ref(), now) {
            pending_equipment.push(equipment.id);
        }
    }

    Ok(RoomReadiness {
        room_id: room.id,
        room_number: room.room_number,
        ready: pending_beds.is_empty() && pending_equipment.is_empty(),
        pending_beds,
        pending_equipment,
    })
}
