//! Mapping of domain errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bedflow_core::TurnoverError;
use serde::Serialize;
use tracing::error;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Handler error wrapping a [`TurnoverError`].
#[derive(Debug)]
pub struct ApiError(pub TurnoverError);

impl From<TurnoverError> for ApiError {
    fn from(e: TurnoverError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TurnoverError::NotFound { .. } => StatusCode::NOT_FOUND,
            TurnoverError::InvalidTransition { .. }
            | TurnoverError::ConflictingAssignment { .. }
            | TurnoverError::NoCompatibleBed(_) => StatusCode::CONFLICT,
            TurnoverError::Validation(_) => StatusCode::BAD_REQUEST,
            TurnoverError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind: self.0.kind_name().to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
