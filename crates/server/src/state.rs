use std::sync::Arc;

use bedflow_core::{AuditStore, Config, SanitizedConfig, TurnoverService};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<TurnoverService>,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        service: Arc<TurnoverService>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            service,
            audit_store,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &TurnoverService {
        &self.service
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }
}
