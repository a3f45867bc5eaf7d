use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::AuditEvent;
use crate::clock::{Clock, SystemClock};

/// Envelope wrapping an audit event with its emission time
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

/// Handle for emitting audit events
///
/// Cheaply cloneable. Events go through a bounded channel to the
/// `AuditWriter`; a full or closed channel is logged and never fails the
/// caller.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
    clock: Arc<dyn Clock>,
}

impl AuditHandle {
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self::with_clock(tx, Arc::new(SystemClock))
    }

    /// Stamp events with `clock` instead of wall-clock time.
    pub fn with_clock(tx: mpsc::Sender<AuditEventEnvelope>, clock: Arc<dyn Clock>) -> Self {
        Self { tx, clock }
    }

    fn envelope(&self, event: AuditEvent) -> AuditEventEnvelope {
        AuditEventEnvelope {
            timestamp: self.clock.now(),
            event,
        }
    }

    /// Emit an event, waiting for channel capacity.
    pub async fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.tx.send(self.envelope(event)).await {
            tracing::error!("Failed to emit audit event: {}", e);
        }
    }

    /// Emit without waiting. Returns false if the event was dropped.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        match self.tx.try_send(self.envelope(event)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropped audit event: {}", e);
                false
            }
        }
    }
}
