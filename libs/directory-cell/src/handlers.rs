// libs/directory-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    CreateParentRequest, CreateTeacherRequest, CreateUserRequest, DirectoryError,
    UpdateParentRequest, UpdateTeacherRequest, UpdateUserRequest,
};
use crate::services::directory::DirectoryService;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<i32>,
    pub skip: Option<i32>,
}

impl PageParams {
    fn limit(&self) -> i32 {
        self.limit.unwrap_or(100)
    }

    fn skip(&self) -> i32 {
        self.skip.unwrap_or(0)
    }
}

fn map_directory_error(e: DirectoryError) -> AppError {
    match e {
        DirectoryError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
        DirectoryError::EmailTaken(_) | DirectoryError::ProfileExists(_) => {
            AppError::Conflict(e.to_string())
        }
        DirectoryError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// USER HANDLERS
// ==============================================================================

pub async fn list_users(
    State(state): State<Arc<AppConfig>>,
    Query(page): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let users = service
        .list_users(page.limit(), page.skip())
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!({ "total": users.len(), "users": users })))
}

pub async fn get_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let user = service.get_user(user_id).await.map_err(map_directory_error)?;
    Ok(Json(json!(user)))
}

pub async fn create_user(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let user = service
        .create_user(request)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(user)))
}

pub async fn update_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let user = service
        .update_user(user_id, request)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(user)))
}

pub async fn delete_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    service
        .delete_user(user_id)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

// ==============================================================================
// TEACHER HANDLERS
// ==============================================================================

pub async fn list_teachers(
    State(state): State<Arc<AppConfig>>,
    Query(page): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let teachers = service
        .list_teachers(page.limit(), page.skip())
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!({ "total": teachers.len(), "teachers": teachers })))
}

pub async fn get_teacher(
    State(state): State<Arc<AppConfig>>,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let teacher = service
        .get_teacher(teacher_id)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(teacher)))
}

pub async fn create_teacher(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateTeacherRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let teacher = service
        .create_teacher(request)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(teacher)))
}

pub async fn update_teacher(
    State(state): State<Arc<AppConfig>>,
    Path(teacher_id): Path<Uuid>,
    Json(request): Json<UpdateTeacherRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let teacher = service
        .update_teacher(teacher_id, request)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(teacher)))
}

pub async fn delete_teacher(
    State(state): State<Arc<AppConfig>>,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    service
        .delete_teacher(teacher_id)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!({ "message": "Teacher deleted successfully" })))
}

// ==============================================================================
// PARENT HANDLERS
// ==============================================================================

pub async fn list_parents(
    State(state): State<Arc<AppConfig>>,
    Query(page): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let parents = service
        .list_parents(page.limit(), page.skip())
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!({ "total": parents.len(), "parents": parents })))
}

pub async fn get_parent(
    State(state): State<Arc<AppConfig>>,
    Path(parent_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let parent = service
        .get_parent(parent_id)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(parent)))
}

pub async fn create_parent(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateParentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let parent = service
        .create_parent(request)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(parent)))
}

pub async fn update_parent(
    State(state): State<Arc<AppConfig>>,
    Path(parent_id): Path<Uuid>,
    Json(request): Json<UpdateParentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let parent = service
        .update_parent(parent_id, request)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!(parent)))
}

pub async fn delete_parent(
    State(state): State<Arc<AppConfig>>,
    Path(parent_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    service
        .delete_parent(parent_id)
        .await
        .map_err(map_directory_error)?;
    Ok(Json(json!({ "message": "Parent deleted successfully" })))
}
