//! Equipment API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bedflow_core::{
    equipment::EquipmentTransition, CreateEquipmentRequest, Equipment, EquipmentFilter,
    EquipmentStatus, EquipmentStatusReport, EquipmentTurnover, StartCleaningRequest,
    TurnoverError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiResult;
use super::turnovers::CancelBody;
use super::{page, PageParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListEquipmentParams {
    pub status: Option<String>,
    pub room_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListEquipmentResponse {
    pub equipment: Vec<Equipment>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetEquipmentStatusBody {
    pub status: EquipmentStatus,
}

#[derive(Debug, Serialize)]
pub struct CleaningHistoryResponse {
    pub turnovers: Vec<EquipmentTurnover>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn create_equipment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEquipmentRequest>,
) -> ApiResult<(StatusCode, Json<Equipment>)> {
    let equipment = state.service().provision_equipment(body)?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

pub async fn list_equipment(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEquipmentParams>,
) -> ApiResult<Json<ListEquipmentResponse>> {
    let (limit, offset) = page(&PageParams {
        limit: params.limit,
        offset: params.offset,
    });

    let mut filter = EquipmentFilter::new().with_limit(limit).with_offset(offset);
    if let Some(ref status) = params.status {
        let status: EquipmentStatus = status
            .parse()
            .map_err(|e| TurnoverError::Validation(format!("{}", e)))?;
        filter = filter.with_status(status);
    }
    if let Some(ref room_id) = params.room_id {
        filter = filter.with_room(room_id);
    }

    let equipment = state.service().list_equipment(&filter)?;
    Ok(Json(ListEquipmentResponse {
        equipment,
        limit,
        offset,
    }))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<EquipmentStatusReport>> {
    Ok(Json(
        state
            .service()
            .get_equipment_status_with_time_remaining(&id)?,
    ))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetEquipmentStatusBody>,
) -> ApiResult<Json<Equipment>> {
    Ok(Json(
        state
            .service()
            .set_equipment_status(&id, body.status)
            .await?,
    ))
}

pub async fn start_cleaning(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StartCleaningRequest>,
) -> ApiResult<(StatusCode, Json<EquipmentTransition>)> {
    let transition = state
        .service()
        .mark_equipment_for_cleaning(&id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(transition)))
}

pub async fn complete_cleaning(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<EquipmentTransition>> {
    Ok(Json(
        state.service().complete_equipment_cleaning(&id).await?,
    ))
}

pub async fn cancel_cleaning(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CancelBody>,
) -> ApiResult<Json<EquipmentTransition>> {
    Ok(Json(
        state
            .service()
            .cancel_equipment_cleaning(&id, &body.reason)
            .await?,
    ))
}

pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<CleaningHistoryResponse>> {
    let (limit, offset) = page(&params);
    let turnovers = state
        .service()
        .equipment_turnover_history(&id, limit, offset)?;
    Ok(Json(CleaningHistoryResponse {
        turnovers,
        limit,
        offset,
    }))
}
