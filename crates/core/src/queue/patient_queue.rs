use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::{
    select_match, EnqueueRequest, PatientQueueEntry, QueueConfig, QueueFilter, QueueStatus,
};
use crate::audit::{AuditEvent, AuditHandle};
use crate::bed::Bed;
use crate::clock::Clock;
use crate::error::{EntityKind, Result, TurnoverError};
use crate::metrics;
use crate::store::FacilityStore;

/// Priority-ordered list of patients awaiting a bed.
///
/// Selection is read-only; entries only become `assigned` through the
/// assignment coordinator, which commits the bed and the entry together.
pub struct PatientQueue {
    store: Arc<dyn FacilityStore>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
    audit: Option<AuditHandle>,
}

impl PatientQueue {
    pub fn new(
        store: Arc<dyn FacilityStore>,
        clock: Arc<dyn Clock>,
        config: QueueConfig,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            audit,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add a patient. Fails with `Validation` if they already have a
    /// waiting entry.
    pub fn enqueue(&self, request: EnqueueRequest) -> Result<PatientQueueEntry> {
        let patient_id = request.patient_id.trim();
        if patient_id.is_empty() {
            return Err(TurnoverError::Validation("patient_id is required".into()));
        }

        let entry = PatientQueueEntry {
            id: Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            priority: request.priority,
            criteria: request.criteria,
            queued_at: self.clock.now(),
            status: QueueStatus::Waiting,
            assigned_bed_id: None,
            resolved_at: None,
            cancel_reason: None,
            notes: request.notes,
        };
        self.store.insert_queue_entry(&entry)?;

        info!(
            entry_id = %entry.id,
            patient_id = %entry.patient_id,
            priority = entry.priority,
            "Patient queued"
        );
        metrics::PATIENTS_QUEUED.inc();
        if let Some(ref audit) = self.audit {
            audit.try_emit(AuditEvent::PatientQueued {
                entry_id: entry.id.clone(),
                patient_id: entry.patient_id.clone(),
                priority: entry.priority,
                criteria: entry.criteria.clone(),
            });
        }
        Ok(entry)
    }

    pub fn get(&self, entry_id: &str) -> Result<PatientQueueEntry> {
        self.store
            .get_queue_entry(entry_id)?
            .ok_or_else(|| TurnoverError::not_found(EntityKind::QueueEntry, entry_id))
    }

    pub fn list(&self, filter: &QueueFilter) -> Result<Vec<PatientQueueEntry>> {
        self.store.list_queue_entries(filter)
    }

    pub fn count(&self, filter: &QueueFilter) -> Result<i64> {
        self.store.count_queue_entries(filter)
    }

    /// Cancel an entry. Already cancelled or assigned entries are returned
    /// unchanged.
    pub fn cancel(&self, entry_id: &str, reason: Option<String>) -> Result<PatientQueueEntry> {
        let entry = self.get(entry_id)?;
        if entry.status != QueueStatus::Waiting {
            debug!(entry_id, status = %entry.status, "Queue entry already resolved");
            return Ok(entry);
        }

        let cancelled =
            self.store
                .cancel_queue_entry(entry_id, reason.as_deref(), self.clock.now())?;
        if cancelled {
            info!(entry_id, patient_id = %entry.patient_id, "Queue entry cancelled");
            if let Some(ref audit) = self.audit {
                audit.try_emit(AuditEvent::QueueEntryCancelled {
                    entry_id: entry_id.to_string(),
                    patient_id: entry.patient_id.clone(),
                    reason,
                });
            }
        }
        self.get(entry_id)
    }

    /// Best waiting entry for `bed`, or `None`.
    pub fn dequeue_match(&self, bed: &Bed) -> Result<Option<PatientQueueEntry>> {
        self.dequeue_match_excluding(bed, &HashSet::new())
    }

    /// Like [`dequeue_match`](Self::dequeue_match), skipping candidates that
    /// already lost a race.
    pub fn dequeue_match_excluding(
        &self,
        bed: &Bed,
        excluded: &HashSet<String>,
    ) -> Result<Option<PatientQueueEntry>> {
        let waiting = self.store.waiting_queue_entries()?;
        Ok(select_match(&waiting, bed, &self.config, self.clock.now(), excluded).cloned())
    }
}
