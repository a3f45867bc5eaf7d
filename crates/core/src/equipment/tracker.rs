//! Equipment cleaning cycles, tracked the same way as bed turnovers.
//!
//! Nothing here touches beds; room readiness combines the two.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{
    Equipment, EquipmentRegistry, EquipmentStatus, EquipmentTurnover, StartCleaningRequest,
};
use crate::audit::{AuditEvent, AuditHandle, CompletedBy};
use crate::clock::Clock;
use crate::error::{EntityKind, Result, TurnoverError};
use crate::locks::KeyedLocks;
use crate::metrics;
use crate::store::{FacilityStore, TurnoverClose};
use crate::turnover::{
    CleaningCycle, EquipmentStatusReport, TurnoverConfig, TurnoverFilter, TurnoverStatus,
};

/// An equipment item together with the cleaning cycle that just changed it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EquipmentTransition {
    pub equipment: Equipment,
    pub turnover: EquipmentTurnover,
}

pub struct EquipmentTurnoverTracker {
    store: Arc<dyn FacilityStore>,
    registry: Arc<EquipmentRegistry>,
    locks: KeyedLocks,
    clock: Arc<dyn Clock>,
    config: TurnoverConfig,
    audit: Option<AuditHandle>,
}

impl EquipmentTurnoverTracker {
    pub fn new(
        store: Arc<dyn FacilityStore>,
        registry: Arc<EquipmentRegistry>,
        clock: Arc<dyn Clock>,
        config: TurnoverConfig,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            registry,
            locks: KeyedLocks::new(),
            clock,
            config,
            audit,
        }
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }

    pub async fn start_cleaning(
        &self,
        equipment_id: &str,
        request: StartCleaningRequest,
    ) -> Result<EquipmentTransition> {
        let _guard = self.locks.acquire(equipment_id).await;

        let equipment = self.registry.get(equipment_id)?;
        if !equipment.status.can_start_cleaning() {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Equipment,
                equipment_id,
                equipment.status,
                "start cleaning on",
            ));
        }
        let minutes = self
            .config
            .resolve_minutes(request.estimated_duration_minutes, request.turnover_type)?;

        let release = self
            .registry
            .prepare_write(&equipment, EquipmentStatus::Cleaning);
        let now = release.updated_at;
        let turnover = EquipmentTurnover {
            id: Uuid::new_v4().to_string(),
            equipment_id: equipment_id.to_string(),
            status: TurnoverStatus::Cleaning,
            turnover_type: request.turnover_type,
            release_time: now,
            cleaning_start_time: now,
            estimated_cleaning_duration_minutes: minutes,
            actual_completion_time: None,
            cancel_reason: None,
            notes: request.notes,
        };
        let equipment = self.store.begin_equipment_turnover(&release, &turnover)?;

        info!(
            equipment_id,
            turnover_id = %turnover.id,
            estimated_minutes = minutes,
            "Equipment cleaning started"
        );
        metrics::TURNOVERS_STARTED
            .with_label_values(&["equipment", turnover.turnover_type.as_str()])
            .inc();
        self.emit(AuditEvent::EquipmentCleaningStarted {
            turnover_id: turnover.id.clone(),
            equipment_id: equipment_id.to_string(),
            turnover_type: turnover.turnover_type.to_string(),
            estimated_minutes: minutes,
        })
        .await;

        Ok(EquipmentTransition {
            equipment,
            turnover,
        })
    }

    /// Finish the cycle; the item becomes `available`.
    pub async fn complete_cleaning(
        &self,
        equipment_id: &str,
        completed_by: CompletedBy,
    ) -> Result<EquipmentTransition> {
        let _guard = self.locks.acquire(equipment_id).await;

        let equipment = self.registry.get(equipment_id)?;
        let active = self.cleaning_cycle(&equipment, "complete cleaning on")?;

        let write = self
            .registry
            .prepare_write(&equipment, EquipmentStatus::Available);
        let now = write.updated_at;
        let close = TurnoverClose {
            turnover_id: active.id.clone(),
            status: TurnoverStatus::Completed,
            at: now,
            cancel_reason: None,
        };
        let (equipment, turnover) = self.store.close_equipment_turnover(&close, &write)?;

        let actual_minutes =
            (now - turnover.cleaning_start_time).num_milliseconds().max(0) as f64 / 60_000.0;
        info!(
            equipment_id,
            turnover_id = %turnover.id,
            actual_minutes,
            completed_by = completed_by.as_str(),
            "Equipment cleaning completed"
        );
        metrics::TURNOVERS_COMPLETED
            .with_label_values(&["equipment", completed_by.as_str()])
            .inc();
        metrics::TURNOVER_DURATION
            .with_label_values(&["equipment", turnover.turnover_type.as_str()])
            .observe(actual_minutes);
        self.emit(AuditEvent::EquipmentCleaningCompleted {
            turnover_id: turnover.id.clone(),
            equipment_id: equipment_id.to_string(),
            actual_minutes,
            completed_by,
        })
        .await;

        Ok(EquipmentTransition {
            equipment,
            turnover,
        })
    }

    /// Abort the cycle; the item goes to `maintenance`.
    pub async fn cancel_cleaning(
        &self,
        equipment_id: &str,
        reason: &str,
    ) -> Result<EquipmentTransition> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TurnoverError::Validation(
                "a cancellation reason is required".into(),
            ));
        }

        let _guard = self.locks.acquire(equipment_id).await;

        let equipment = self.registry.get(equipment_id)?;
        let active = self.cleaning_cycle(&equipment, "cancel cleaning on")?;

        let write = self
            .registry
            .prepare_write(&equipment, EquipmentStatus::Maintenance);
        let close = TurnoverClose {
            turnover_id: active.id.clone(),
            status: TurnoverStatus::Cancelled,
            at: write.updated_at,
            cancel_reason: Some(reason.to_string()),
        };
        let (equipment, turnover) = self.store.close_equipment_turnover(&close, &write)?;

        info!(equipment_id, turnover_id = %turnover.id, reason, "Equipment cleaning cancelled");
        metrics::TURNOVERS_CANCELLED
            .with_label_values(&["equipment"])
            .inc();
        self.emit(AuditEvent::EquipmentCleaningCancelled {
            turnover_id: turnover.id.clone(),
            equipment_id: equipment_id.to_string(),
            reason: reason.to_string(),
        })
        .await;

        Ok(EquipmentTransition {
            equipment,
            turnover,
        })
    }

    /// Administrative status change, serialized with the cleaning cycle.
    pub async fn set_status(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
    ) -> Result<Equipment> {
        let _guard = self.locks.acquire(equipment_id).await;
        self.registry.set_status(equipment_id, status)
    }

    pub fn get_status(&self, equipment_id: &str) -> Result<EquipmentStatusReport> {
        let equipment = self.registry.get(equipment_id)?;
        let active = self.store.active_equipment_turnover(equipment_id)?;
        Ok(EquipmentStatusReport::new(
            &equipment,
            active.as_ref(),
            self.clock.now(),
        ))
    }

    pub fn history(
        &self,
        equipment_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EquipmentTurnover>> {
        self.registry.get(equipment_id)?;
        self.store.list_equipment_turnovers(
            &TurnoverFilter::new()
                .with_subject(equipment_id)
                .with_limit(limit)
                .with_offset(offset),
        )
    }

    /// Items whose cleaning estimate has elapsed at `now`.
    pub fn due_equipment(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let active = self
            .store
            .list_equipment_turnovers(&TurnoverFilter::new().active().with_limit(i64::MAX))?;
        Ok(active
            .into_iter()
            .filter(|t| t.status_at(now) == TurnoverStatus::Ready)
            .map(|t| t.equipment_id)
            .collect())
    }

    fn cleaning_cycle(&self, equipment: &Equipment, operation: &str) -> Result<EquipmentTurnover> {
        match self.store.active_equipment_turnover(&equipment.id)? {
            Some(t) if t.status == TurnoverStatus::Cleaning => Ok(t),
            _ => Err(TurnoverError::invalid_transition(
                EntityKind::Equipment,
                &equipment.id,
                equipment.status,
                operation,
            )),
        }
    }
}
