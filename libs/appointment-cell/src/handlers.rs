// libs/appointment-cell/src/handlers.rs
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
    AppointmentError, AppointmentSearchQuery, AppointmentStatus, AppointmentStatusUpdateRequest,
    BookAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub parent_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub slot_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub skip: Option<i32>,
}

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::ParentNotFound => AppError::NotFound("Parent not found".to_string()),
        AppointmentError::SlotUnavailable => {
            AppError::Conflict("Slot is not available for booking".to_string())
        }
        AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(e.to_string()),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .book_appointment(request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let response = service
        .search_appointments(AppointmentSearchQuery {
            parent_id: params.parent_id,
            teacher_id: params.teacher_id,
            status: params.status,
            slot_id: params.slot_id,
            limit: params.limit,
            offset: params.skip,
        })
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(response)))
}

pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .get_appointment(appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<AppointmentStatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .update_status(appointment_id, request.status)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .cancel_appointment(appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment": appointment
    })))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

pub async fn get_parent_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(parent_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let response = service
        .parent_appointments(parent_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(response)))
}

pub async fn get_teacher_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let response = service
        .teacher_appointments(teacher_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(response)))
}
