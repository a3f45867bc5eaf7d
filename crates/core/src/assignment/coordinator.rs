//! Bed-to-patient matching under the per-bed lock.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::Assignment;
use crate::audit::{AuditEvent, AuditHandle};
use crate::bed::{Bed, BedFilter, BedRegistry, BedStatus};
use crate::error::{EntityKind, Result, TurnoverError};
use crate::locks::{KeyedGuard, KeyedLocks};
use crate::metrics;
use crate::queue::{PatientQueue, PatientQueueEntry, QueueStatus};
use crate::store::FacilityStore;

/// Hands available beds to the best waiting patient.
///
/// Selection and commit happen while the bed's lock is held, and the commit
/// itself marks the entry `assigned` and occupies the bed in one transaction.
/// A candidate that loses a race (claimed by another bed, or already in a
/// bed) is skipped and the next best is tried, up to `max_retries` times.
pub struct AssignmentCoordinator {
    store: Arc<dyn FacilityStore>,
    registry: Arc<BedRegistry>,
    queue: Arc<PatientQueue>,
    locks: Arc<KeyedLocks>,
    audit: Option<AuditHandle>,
    max_retries: u32,
}

impl AssignmentCoordinator {
    pub fn new(
        store: Arc<dyn FacilityStore>,
        registry: Arc<BedRegistry>,
        queue: Arc<PatientQueue>,
        locks: Arc<KeyedLocks>,
        audit: Option<AuditHandle>,
    ) -> Self {
        let max_retries = queue.config().max_assignment_retries;
        Self {
            store,
            registry,
            queue,
            locks,
            audit,
            max_retries,
        }
    }

    /// Try to fill `bed_id` from the queue.
    ///
    /// Returns `Ok(None)` when the bed is not available or nobody compatible
    /// is waiting; the bed and the queue are then left untouched.
    pub async fn on_bed_available(&self, bed_id: &str) -> Result<Option<Assignment>> {
        let guard = self.locks.acquire(bed_id).await;
        self.assign_locked(&guard).await
    }

    /// [`on_bed_available`](Self::on_bed_available) for a caller that already
    /// holds the bed's lock.
    pub async fn assign_locked(&self, guard: &KeyedGuard) -> Result<Option<Assignment>> {
        let bed_id = guard.key();
        let mut excluded = HashSet::new();

        for attempt in 0..=self.max_retries {
            let bed = self.registry.get(bed_id)?;
            if bed.status != BedStatus::Available {
                debug!(bed_id, status = %bed.status, "Bed not available, skipping assignment");
                return Ok(None);
            }

            let Some(candidate) = self.queue.dequeue_match_excluding(&bed, &excluded)? else {
                debug!(bed_id, attempt, "No compatible patient waiting");
                metrics::ASSIGNMENT_ATTEMPTS
                    .with_label_values(&["no_match"])
                    .inc();
                return Ok(None);
            };

            match self.commit(&bed, &candidate).await {
                Ok(assignment) => return Ok(Some(assignment)),
                Err(e) if e.is_conflict() => {
                    excluded.insert(candidate.id);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            bed_id,
            retries = self.max_retries,
            "Assignment retries exhausted, bed left available"
        );
        metrics::ASSIGNMENT_ATTEMPTS
            .with_label_values(&["exhausted"])
            .inc();
        Ok(None)
    }

    /// Assign the next waiting patient to an available bed, on request.
    ///
    /// Fails with `NoCompatibleBed` when nobody waiting fits the bed.
    pub async fn assign_next_patient_to_bed(&self, bed_id: &str) -> Result<Assignment> {
        let guard = self.locks.acquire(bed_id).await;
        let bed = self.registry.get(bed_id)?;
        if bed.status != BedStatus::Available {
            return Err(TurnoverError::invalid_transition(
                EntityKind::Bed,
                bed_id,
                bed.status,
                "assign patient to",
            ));
        }

        self.assign_locked(&guard).await?.ok_or_else(|| {
            TurnoverError::NoCompatibleBed(format!("no waiting patient matches bed {}", bed_id))
        })
    }

    /// Find a bed for one waiting entry right now.
    ///
    /// Each available compatible bed is tried under its own lock. The entry
    /// stays `waiting` when nothing fits; re-queueing is the caller's call.
    pub async fn assign_bed_to_patient(&self, entry_id: &str) -> Result<Assignment> {
        let entry = self.queue.get(entry_id)?;
        if entry.status != QueueStatus::Waiting {
            return Err(TurnoverError::invalid_transition(
                EntityKind::QueueEntry,
                entry_id,
                entry.status,
                "assign a bed to",
            ));
        }

        let candidates: Vec<Bed> = self
            .registry
            .list(
                &BedFilter::new()
                    .with_status(BedStatus::Available)
                    .with_limit(i64::MAX),
            )?
            .into_iter()
            .filter(|bed| entry.criteria.matches(bed))
            .collect();

        let mut conflicts = 0;
        for candidate in candidates {
            let _guard = self.locks.acquire(&candidate.id).await;
            // Re-read under the lock; the listing may be stale.
            let bed = self.registry.get(&candidate.id)?;
            if bed.status != BedStatus::Available || !entry.criteria.matches(&bed) {
                continue;
            }

            match self.commit(&bed, &entry).await {
                Ok(assignment) => return Ok(assignment),
                Err(e) if e.is_conflict() => {
                    let current = self.queue.get(entry_id)?;
                    if current.status != QueueStatus::Waiting {
                        return Err(TurnoverError::invalid_transition(
                            EntityKind::QueueEntry,
                            entry_id,
                            current.status,
                            "assign a bed to",
                        ));
                    }
                    conflicts += 1;
                    if conflicts > self.max_retries {
                        warn!(entry_id, "Assignment retries exhausted for patient");
                        metrics::ASSIGNMENT_ATTEMPTS
                            .with_label_values(&["exhausted"])
                            .inc();
                        return Err(TurnoverError::NoCompatibleBed(format!(
                            "no bed could be secured for patient {}",
                            entry.patient_id
                        )));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        metrics::ASSIGNMENT_ATTEMPTS
            .with_label_values(&["no_match"])
            .inc();
        Err(TurnoverError::NoCompatibleBed(format!(
            "no available bed matches patient {}",
            entry.patient_id
        )))
    }

    /// Commit one bed/entry pairing. Conflicts are logged and audited before
    /// being returned.
    async fn commit(&self, bed: &Bed, entry: &PatientQueueEntry) -> Result<Assignment> {
        let write = self.registry.prepare_assignment(bed, &entry.patient_id)?;
        let now = write.updated_at;

        match self.store.assign_from_queue(&write, &entry.id, now) {
            Ok((bed, entry)) => {
                let assignment = Assignment { bed, entry };
                let waited = assignment.waited_minutes(now);

                info!(
                    bed_id = %assignment.bed.id,
                    patient_id = %assignment.patient_id(),
                    priority = assignment.entry.priority,
                    waited_minutes = waited,
                    "Patient assigned to bed"
                );
                metrics::ASSIGNMENT_ATTEMPTS
                    .with_label_values(&["assigned"])
                    .inc();
                metrics::QUEUE_WAIT.with_label_values(&[]).observe(waited);

                if let Some(ref audit) = self.audit {
                    audit
                        .emit(AuditEvent::PatientAssigned {
                            entry_id: assignment.entry.id.clone(),
                            patient_id: assignment.entry.patient_id.clone(),
                            bed_id: assignment.bed.id.clone(),
                            priority: assignment.entry.priority,
                            waited_minutes: waited,
                        })
                        .await;
                }
                Ok(assignment)
            }
            Err(e) if e.is_conflict() => {
                warn!(
                    bed_id = %bed.id,
                    entry_id = %entry.id,
                    error = %e,
                    "Conflicting assignment, trying next candidate"
                );
                metrics::ASSIGNMENT_CONFLICTS.inc();
                if let Some(ref audit) = self.audit {
                    audit
                        .emit(AuditEvent::AssignmentConflict {
                            bed_id: bed.id.clone(),
                            entry_id: entry.id.clone(),
                            patient_id: entry.patient_id.clone(),
                            reason: e.to_string(),
                        })
                        .await;
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
