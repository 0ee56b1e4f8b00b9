// libs/directory-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn user_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_users))
        .route("/", post(handlers::create_user))
        .route("/{user_id}", get(handlers::get_user))
        .route("/{user_id}", put(handlers::update_user))
        .route("/{user_id}", delete(handlers::delete_user))
        .with_state(state)
}

pub fn teacher_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_teachers))
        .route("/", post(handlers::create_teacher))
        .route("/{teacher_id}", get(handlers::get_teacher))
        .route("/{teacher_id}", put(handlers::update_teacher))
        .route("/{teacher_id}", delete(handlers::delete_teacher))
        .with_state(state)
}

pub fn parent_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_parents))
        .route("/", post(handlers::create_parent))
        .route("/{parent_id}", get(handlers::get_parent))
        .route("/{parent_id}", put(handlers::update_parent))
        .route("/{parent_id}", delete(handlers::delete_parent))
        .with_state(state)
}
