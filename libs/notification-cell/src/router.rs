// libs/notification-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn notification_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/queue/stats", get(handlers::queue_stats))
        .route("/{notification_id}", get(handlers::get_notification))
        .with_state(state)
}
