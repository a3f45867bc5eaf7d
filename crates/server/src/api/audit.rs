use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bedflow_core::{AuditFilter, AuditRecord, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ErrorResponse;
use super::{page, PageParams};
use crate::state::AppState;

/// Query parameters for audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    /// Filter by subject kind: room, bed, equipment or queue_entry
    pub subject_kind: Option<String>,
    /// Filter by room, bed, equipment or queue entry id
    pub subject_id: Option<String>,
    /// Filter by patient id
    pub patient_id: Option<String>,
    /// Filter by event type; several may be given comma-separated
    pub event_type: Option<String>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for audit query endpoint
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn bad_request(error: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error,
            kind: "validation_error".to_string(),
        }),
    )
}

fn storage_error(context: &str, e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{}: {}", context, e),
            kind: "database_error".to_string(),
        }),
    )
}

/// Query audit events
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, impl IntoResponse> {
    let (limit, offset) = page(&PageParams {
        limit: params.limit,
        offset: params.offset,
    });

    // Shared between query and count
    let mut base_filter = AuditFilter::new();

    if let Some(ref kind) = params.subject_kind {
        match kind.parse::<EntityKind>() {
            Ok(kind) => base_filter = base_filter.with_subject_kind(kind),
            Err(e) => return Err(bad_request(e)),
        }
    }

    if let Some(ref subject_id) = params.subject_id {
        base_filter = base_filter.with_subject_id(subject_id);
    }

    if let Some(ref patient_id) = params.patient_id {
        base_filter = base_filter.with_patient_id(patient_id);
    }

    if let Some(ref event_type) = params.event_type {
        base_filter = base_filter.with_event_types(
            event_type
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        );
    }

    if let Some(from) = params.from {
        base_filter = base_filter.since(from);
    }

    if let Some(to) = params.to {
        base_filter = base_filter.until(to);
    }

    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let events = match state.audit_store().query(&query_filter) {
        Ok(events) => events,
        Err(e) => return Err(storage_error("Failed to query audit events", e)),
    };

    let total = match state.audit_store().count(&base_filter) {
        Ok(count) => count,
        Err(e) => return Err(storage_error("Failed to count audit events", e)),
    };

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
