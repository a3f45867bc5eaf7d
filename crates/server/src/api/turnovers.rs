//! Bed turnover API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bedflow_core::{
    turnover::TurnoverTransition, BedStatusReport, BedTurnover, CompletionOutcome,
    StartTurnoverRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiResult;
use super::{page, PageParams};
use crate::state::AppState;

/// Request body for cancelling a cleaning cycle
#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct TurnoverHistoryResponse {
    pub turnovers: Vec<BedTurnover>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct ActiveTurnoversResponse {
    pub turnovers: Vec<BedStatusReport>,
}

pub async fn start_turnover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StartTurnoverRequest>,
) -> ApiResult<(StatusCode, Json<TurnoverTransition>)> {
    let transition = state.service().start_bed_turnover(&id, body).await?;
    Ok((StatusCode::CREATED, Json(transition)))
}

pub async fn complete_turnover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CompletionOutcome>> {
    Ok(Json(state.service().complete_bed_cleaning(&id).await?))
}

pub async fn cancel_turnover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CancelBody>,
) -> ApiResult<Json<TurnoverTransition>> {
    Ok(Json(
        state
            .service()
            .cancel_bed_turnover(&id, &body.reason)
            .await?,
    ))
}

pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<TurnoverHistoryResponse>> {
    let (limit, offset) = page(&params);
    let turnovers = state.service().bed_turnover_history(&id, limit, offset)?;
    Ok(Json(TurnoverHistoryResponse {
        turnovers,
        limit,
        offset,
    }))
}

/// Every bed currently cleaning, with progress.
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ActiveTurnoversResponse>> {
    let turnovers = state.service().active_bed_turnovers()?;
    Ok(Json(ActiveTurnoversResponse { turnovers }))
}
