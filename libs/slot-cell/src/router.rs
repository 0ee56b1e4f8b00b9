// libs/slot-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn slot_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_slots))
        .route("/", post(handlers::create_slot))
        .route("/bulk", post(handlers::bulk_create_slots))
        .route("/smart/preview", post(handlers::smart_preview))
        .route("/smart/create", post(handlers::smart_create))
        .route("/bulk-advanced", post(handlers::bulk_advanced))
        .route("/{slot_id}", get(handlers::get_slot))
        .route("/{slot_id}", put(handlers::update_slot))
        .route("/{slot_id}", delete(handlers::delete_slot))
        .route(
            "/teacher/{teacher_id}/schedule",
            get(handlers::teacher_weekly_schedule),
        )
        .with_state(state)
}
