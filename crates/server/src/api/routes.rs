use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::metrics_middleware;
use super::{audit, beds, equipment, handlers, queue, rooms, turnovers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Rooms
        .route("/rooms", post(rooms::create_room).get(rooms::list_rooms))
        .route("/rooms/{id}/readiness", get(rooms::get_readiness))
        // Beds
        .route("/beds", post(beds::create_bed).get(beds::list_beds))
        .route("/beds/{id}", get(beds::get_bed))
        .route(
            "/beds/{id}/status",
            get(beds::get_bed_status).put(beds::set_bed_status),
        )
        .route("/beds/{id}/assign", post(beds::assign_next_patient))
        // Bed turnovers
        .route("/beds/{id}/turnover", post(turnovers::start_turnover))
        .route(
            "/beds/{id}/turnover/complete",
            post(turnovers::complete_turnover),
        )
        .route("/beds/{id}/turnover/cancel", post(turnovers::cancel_turnover))
        .route("/beds/{id}/turnovers", get(turnovers::list_history))
        .route("/turnovers/active", get(turnovers::list_active))
        // Patient queue
        .route("/queue", post(queue::enqueue).get(queue::list_queue))
        .route(
            "/queue/{id}",
            get(queue::get_entry).delete(queue::cancel_entry),
        )
        .route("/queue/{id}/assign", post(queue::assign_bed))
        // Equipment
        .route(
            "/equipment",
            post(equipment::create_equipment).get(equipment::list_equipment),
        )
        .route(
            "/equipment/{id}/status",
            get(equipment::get_status).put(equipment::set_status),
        )
        .route("/equipment/{id}/turnovers", get(equipment::list_history))
        .route("/equipment/{id}/cleaning", post(equipment::start_cleaning))
        .route(
            "/equipment/{id}/cleaning/complete",
            post(equipment::complete_cleaning),
        )
        .route(
            "/equipment/{id}/cleaning/cancel",
            post(equipment::cancel_cleaning),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
