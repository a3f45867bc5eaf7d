//! Patient queue API handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bedflow_core::{
    Assignment, EnqueueRequest, PatientQueueEntry, QueueFilter, QueueStatus, TurnoverError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiResult;
use super::{page, PageParams};
use crate::state::AppState;

/// Query parameters for listing queue entries
#[derive(Debug, Deserialize)]
pub struct ListQueueParams {
    pub status: Option<String>,
    pub patient_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListQueueResponse {
    pub entries: Vec<PatientQueueEntry>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for cancelling a queue entry
#[derive(Debug, Default, Deserialize)]
pub struct CancelEntryBody {
    pub reason: Option<String>,
}

/// Queue a patient. A bed that is already available is not claimed here;
/// `POST /queue/{id}/assign` does that.
pub async fn enqueue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueRequest>,
) -> ApiResult<(StatusCode, Json<PatientQueueEntry>)> {
    let entry = state.service().add_patient_to_queue(body)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_queue(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQueueParams>,
) -> ApiResult<Json<ListQueueResponse>> {
    let (limit, offset) = page(&PageParams {
        limit: params.limit,
        offset: params.offset,
    });

    let mut base_filter = QueueFilter::new();
    if let Some(ref status) = params.status {
        let status: QueueStatus = status
            .parse()
            .map_err(|e| TurnoverError::Validation(format!("{}", e)))?;
        base_filter = base_filter.with_status(status);
    }
    if let Some(ref patient_id) = params.patient_id {
        base_filter = base_filter.with_patient(patient_id);
    }

    let entries = state
        .service()
        .list_queue(&base_filter.clone().with_limit(limit).with_offset(offset))?;
    let total = state.service().count_queue(&base_filter)?;

    Ok(Json(ListQueueResponse {
        entries,
        total,
        limit,
        offset,
    }))
}

pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PatientQueueEntry>> {
    Ok(Json(state.service().get_queue_entry(&id)?))
}

/// Cancel a waiting entry. The body is optional.
pub async fn cancel_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<PatientQueueEntry>> {
    let body: CancelEntryBody = if body.is_empty() {
        CancelEntryBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| TurnoverError::Validation(format!("invalid body: {}", e)))?
    };
    Ok(Json(state.service().cancel_queue_entry(&id, body.reason)?))
}

/// Find a bed for this entry right now.
pub async fn assign_bed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Assignment>> {
    Ok(Json(state.service().assign_bed_to_patient(&id).await?))
}
