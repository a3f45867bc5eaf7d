//! Room API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bedflow_core::{readiness::RoomReadiness, CreateRoomRequest, Room};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListRoomsResponse {
    pub rooms: Vec<Room>,
}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<Room>)> {
    let room = state.service().provision_room(body)?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn list_rooms(State(state): State<Arc<AppState>>) -> ApiResult<Json<ListRoomsResponse>> {
    let rooms = state.service().list_rooms()?;
    Ok(Json(ListRoomsResponse { rooms }))
}

/// Whether every bed and equipment item in the room is clean.
pub async fn get_readiness(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RoomReadiness>> {
    Ok(Json(state.service().room_readiness(&id)?))
}
