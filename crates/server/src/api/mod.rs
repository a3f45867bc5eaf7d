pub mod audit;
pub mod beds;
pub mod equipment;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod queue;
pub mod rooms;
pub mod routes;
pub mod turnovers;

use serde::Deserialize;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;

/// Maximum allowed limit for list queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for list queries
const DEFAULT_LIMIT: i64 = 100;

/// Pagination query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Clamp pagination to `(1..=MAX_LIMIT, >= 0)`.
fn page(params: &PageParams) -> (i64, i64) {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    (limit, offset)
}
