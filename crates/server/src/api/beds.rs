//! Bed API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bedflow_core::{
    Assignment, Bed, BedFilter, BedStatus, BedStatusReport, CreateBedRequest, TurnoverError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiResult;
use super::{page, PageParams};
use crate::state::AppState;

/// Query parameters for listing beds
#[derive(Debug, Deserialize)]
pub struct ListBedsParams {
    pub status: Option<String>,
    pub room_id: Option<String>,
    pub department: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListBedsResponse {
    pub beds: Vec<Bed>,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for an administrative status change
#[derive(Debug, Deserialize)]
pub struct SetBedStatusBody {
    pub status: BedStatus,
}

pub async fn create_bed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBedRequest>,
) -> ApiResult<(StatusCode, Json<Bed>)> {
    let bed = state.service().provision_bed(body).await?;
    Ok((StatusCode::CREATED, Json(bed)))
}

pub async fn list_beds(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListBedsParams>,
) -> ApiResult<Json<ListBedsResponse>> {
    let (limit, offset) = page(&PageParams {
        limit: params.limit,
        offset: params.offset,
    });

    let mut filter = BedFilter::new().with_limit(limit).with_offset(offset);
    if let Some(ref status) = params.status {
        let status: BedStatus = status
            .parse()
            .map_err(|e| TurnoverError::Validation(format!("{}", e)))?;
        filter = filter.with_status(status);
    }
    if let Some(ref room_id) = params.room_id {
        filter = filter.with_room(room_id);
    }
    if let Some(ref department) = params.department {
        filter = filter.with_department(department);
    }

    let beds = state.service().list_beds(&filter)?;
    Ok(Json(ListBedsResponse {
        beds,
        limit,
        offset,
    }))
}

pub async fn get_bed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bed>> {
    Ok(Json(state.service().get_bed(&id)?))
}

/// Bed status with live cleaning progress.
pub async fn get_bed_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BedStatusReport>> {
    Ok(Json(
        state.service().get_bed_status_with_time_remaining(&id)?,
    ))
}

pub async fn set_bed_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetBedStatusBody>,
) -> ApiResult<Json<Bed>> {
    Ok(Json(state.service().set_bed_status(&id, body.status).await?))
}

/// Hand an available bed to the best waiting patient.
pub async fn assign_next_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Assignment>> {
    Ok(Json(state.service().assign_next_patient_to_bed(&id).await?))
}
