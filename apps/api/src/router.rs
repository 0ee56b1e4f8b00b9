use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use directory_cell::router::{parent_routes, teacher_routes, user_routes};
use notification_cell::router::notification_routes;
use shared_config::AppConfig;
use slot_cell::router::slot_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "School bookings API is running!" }))
        .nest("/users", user_routes(state.clone()))
        .nest("/teachers", teacher_routes(state.clone()))
        .nest("/parents", parent_routes(state.clone()))
        .nest("/slots", slot_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/notifications", notification_routes(state))
}
