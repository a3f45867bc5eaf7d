use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{CreateEquipmentRequest, Equipment, EquipmentFilter, EquipmentStatus};
use crate::audit::{AuditEvent, AuditHandle};
use crate::clock::Clock;
use crate::error::{EntityKind, Result, TurnoverError};
use crate::store::{EquipmentWrite, FacilityStore};

/// Equipment identity and status.
pub struct EquipmentRegistry {
    store: Arc<dyn FacilityStore>,
    clock: Arc<dyn Clock>,
    audit: Option<AuditHandle>,
}

impl EquipmentRegistry {
    pub fn new(
        store: Arc<dyn FacilityStore>,
        clock: Arc<dyn Clock>,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Register an item; it starts `in_use`.
    pub fn provision(&self, request: CreateEquipmentRequest) -> Result<Equipment> {
        let name = request.name.trim();
        let equipment_type = request.equipment_type.trim();
        if name.is_empty() {
            return Err(TurnoverError::Validation("name is required".into()));
        }
        if equipment_type.is_empty() {
            return Err(TurnoverError::Validation("equipment_type is required".into()));
        }
        if let Some(ref room_id) = request.room_id {
            if self.store.get_room(room_id)?.is_none() {
                return Err(TurnoverError::not_found(EntityKind::Room, room_id));
            }
        }

        let now = self.clock.now();
        let equipment = Equipment {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            equipment_type: equipment_type.to_string(),
            room_id: request.room_id,
            status: EquipmentStatus::InUse,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_equipment(&equipment)?;

        info!(equipment_id = %equipment.id, name = %equipment.name, "Equipment provisioned");
        if let Some(ref audit) = self.audit {
            audit.try_emit(AuditEvent::EquipmentProvisioned {
                equipment_id: equipment.id.clone(),
                name: equipment.name.clone(),
                equipment_type: equipment.equipment_type.clone(),
                room_id: equipment.room_id.clone(),
            });
        }
        Ok(equipment)
    }

    pub fn get(&self, equipment_id: &str) -> Result<Equipment> {
        self.store
            .get_equipment(equipment_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::Equipment, equipment_id))
    }

    pub fn list(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        self.store.list_equipment(filter)
    }

    /// Administrative change between `available`, `in_use` and `maintenance`.
    pub fn set_status(&self, equipment_id: &str, next: EquipmentStatus) -> Result<Equipment> {
        let equipment = self.get(equipment_id)?;
        if !equipment.status.can_set_to(next) {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Equipment,
                equipment_id,
                equipment.status,
                format!("set status to {} on", next),
            ));
        }

        let updated = self
            .store
            .write_equipment(&self.prepare_write(&equipment, next))?;

        info!(equipment_id, from = %equipment.status, to = %next, "Equipment status changed");
        if let Some(ref audit) = self.audit {
            audit.try_emit(AuditEvent::EquipmentStatusChanged {
                equipment_id: equipment_id.to_string(),
                from_status: equipment.status.to_string(),
                to_status: next.to_string(),
            });
        }
        Ok(updated)
    }

    pub fn prepare_write(&self, equipment: &Equipment, next: EquipmentStatus) -> EquipmentWrite {
        EquipmentWrite {
            equipment_id: equipment.id.clone(),
            expected_version: equipment.version,
            status: next,
            updated_at: self.clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteFacilityStore;
    use crate::testing::ManualClock;

    fn registry() -> EquipmentRegistry {
        EquipmentRegistry::new(
            Arc::new(SqliteFacilityStore::in_memory().unwrap()),
            Arc::new(ManualClock::default()),
            None,
        )
    }

    fn pump() -> CreateEquipmentRequest {
        CreateEquipmentRequest {
            name: "IV pump 3".to_string(),
            equipment_type: "iv_pump".to_string(),
            room_id: None,
        }
    }

    #[test]
    fn test_provision_starts_in_use() {
        let registry = registry();
        let equipment = registry.provision(pump()).unwrap();
        assert_eq!(equipment.status, EquipmentStatus::InUse);
        assert_eq!(registry.get(&equipment.id).unwrap(), equipment);
    }

    #[test]
    fn test_provision_unknown_room() {
        let registry = registry();
        let err = registry
            .provision(CreateEquipmentRequest {
                room_id: Some("missing".to_string()),
                ..pump()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            TurnoverError::NotFound {
                kind: EntityKind::Room,
                ..
            }
        ));
    }

    #[test]
    fn test_set_status_rules() {
        let registry = registry();
        let equipment = registry.provision(pump()).unwrap();

        let updated = registry
            .set_status(&equipment.id, EquipmentStatus::Maintenance)
            .unwrap();
        assert_eq!(updated.status, EquipmentStatus::Maintenance);
        assert_eq!(updated.version, equipment.version + 1);

        let err = registry
            .set_status(&equipment.id, EquipmentStatus::Cleaning)
            .unwrap_err();
        assert!(matches!(err, TurnoverError::InvalidTransition { .. }));
    }
}
