// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/book", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::cancel_appointment))
        .route(
            "/{appointment_id}/status",
            put(handlers::update_appointment_status),
        )
        .route(
            "/parent/{parent_id}/appointments",
            get(handlers::get_parent_appointments),
        )
        .route(
            "/teacher/{teacher_id}/appointments",
            get(handlers::get_teacher_appointments),
        )
        .with_state(state)
}
