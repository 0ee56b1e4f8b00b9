// libs/slot-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AdvancedBulkRequest, BulkSlotCreateRequest, CreateSlotRequest, SlotError, SmartSlotConfig,
    UpdateSlotRequest,
};
use crate::services::bulk::AdvancedBulkService;
use crate::services::generator::SlotGeneratorService;
use crate::services::slots::{SlotListFilter, SlotService};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotQueryParams {
    pub teacher_id: Option<Uuid>,
    pub week_start: Option<NaiveDate>,
    #[serde(default)]
    pub available_only: bool,
    pub skip: Option<i32>,
    pub limit: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQueryParams {
    pub week_start: NaiveDate,
}

fn map_slot_error(e: SlotError) -> AppError {
    match e {
        SlotError::NotFound => AppError::NotFound("Slot not found".to_string()),
        SlotError::TeacherNotFound => AppError::NotFound("Teacher not found".to_string()),
        SlotError::InvalidTimeRange | SlotError::InvalidWeekStart => {
            AppError::ValidationError(e.to_string())
        }
        SlotError::InvalidPattern(msg) => AppError::ValidationError(msg),
        SlotError::SlotConflict { .. } => AppError::Conflict(e.to_string()),
        SlotError::SlotInUse => AppError::Conflict(e.to_string()),
        SlotError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// SLOT CRUD HANDLERS
// ==============================================================================

pub async fn list_slots(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<SlotQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state);

    let response = service
        .list_slots(SlotListFilter {
            teacher_id: params.teacher_id,
            week_start: params.week_start,
            available_only: params.available_only,
            skip: params.skip.unwrap_or(0),
            limit: params.limit.unwrap_or(100),
        })
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!(response)))
}

pub async fn get_slot(
    State(state): State<Arc<AppConfig>>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state);
    let slot = service.get_slot(slot_id).await.map_err(map_slot_error)?;
    Ok(Json(json!(slot)))
}

pub async fn create_slot(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state);
    let slot = service.create_slot(request).await.map_err(map_slot_error)?;
    Ok(Json(json!(slot)))
}

pub async fn update_slot(
    State(state): State<Arc<AppConfig>>,
    Path(slot_id): Path<Uuid>,
    Json(request): Json<UpdateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state);
    let slot = service
        .update_slot(slot_id, request)
        .await
        .map_err(map_slot_error)?;
    Ok(Json(json!(slot)))
}

pub async fn delete_slot(
    State(state): State<Arc<AppConfig>>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state);
    service.delete_slot(slot_id).await.map_err(map_slot_error)?;
    Ok(Json(json!({ "message": "Slot deleted successfully" })))
}

pub async fn bulk_create_slots(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<BulkSlotCreateRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state);
    let slots = service.bulk_create(request).await.map_err(map_slot_error)?;
    let total_created = slots.len();
    Ok(Json(json!({
        "created_slots": slots,
        "total_created": total_created
    })))
}

// ==============================================================================
// SMART / ADVANCED GENERATION HANDLERS
// ==============================================================================

pub async fn smart_preview(
    State(state): State<Arc<AppConfig>>,
    Json(config): Json<SmartSlotConfig>,
) -> Result<Json<Value>, AppError> {
    let service = SlotGeneratorService::new(&state);
    let preview = service.preview(config).await.map_err(map_slot_error)?;
    Ok(Json(json!(preview)))
}

pub async fn smart_create(
    State(state): State<Arc<AppConfig>>,
    Json(config): Json<SmartSlotConfig>,
) -> Result<Json<Value>, AppError> {
    let service = SlotGeneratorService::new(&state);
    let response = service.create(config).await.map_err(map_slot_error)?;
    Ok(Json(json!(response)))
}

pub async fn bulk_advanced(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<AdvancedBulkRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AdvancedBulkService::new(&state);
    let response = service.generate(request).await.map_err(map_slot_error)?;
    Ok(Json(json!(response)))
}

// ==============================================================================
// CALENDAR VIEW HANDLERS
// ==============================================================================

pub async fn teacher_weekly_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(teacher_id): Path<Uuid>,
    Query(params): Query<ScheduleQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&state);
    let schedule = service
        .weekly_schedule(teacher_id, params.week_start)
        .await
        .map_err(map_slot_error)?;
    Ok(Json(json!(schedule)))
}
