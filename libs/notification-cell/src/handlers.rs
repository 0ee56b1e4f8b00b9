// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::error::AppError;

use crate::models::Notification;
use crate::services::queue::RedisQueueService;

#[derive(Debug, Deserialize)]
pub struct NotificationQueryParams {
    pub recipient_email: Option<String>,
    pub appointment_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i32>,
    pub skip: Option<i32>,
}

pub async fn list_notifications(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<NotificationQueryParams>,
) -> Result<Json<Value>, AppError> {
    let db = PostgrestClient::new(&state);

    let mut query_parts = Vec::new();
    if let Some(email) = &params.recipient_email {
        query_parts.push(format!("recipient_email=eq.{}", urlencoding::encode(email)));
    }
    if let Some(appointment_id) = params.appointment_id {
        query_parts.push(format!("appointment_id=eq.{}", appointment_id));
    }
    if let Some(status) = &params.status {
        query_parts.push(format!("status=eq.{}", status));
    }
    query_parts.push("order=created_at.desc".to_string());
    query_parts.push(format!("limit={}", params.limit.unwrap_or(50)));
    if let Some(skip) = params.skip {
        query_parts.push(format!("offset={}", skip));
    }

    let path = format!("/rest/v1/notifications?{}", query_parts.join("&"));
    let rows: Vec<Value> = db
        .request(Method::GET, &path, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let notifications: Vec<Notification> = rows
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Notification>, _>>()
        .map_err(|e| AppError::Internal(format!("Failed to parse notifications: {}", e)))?;

    Ok(Json(json!({
        "total": notifications.len(),
        "notifications": notifications
    })))
}

pub async fn get_notification(
    State(state): State<Arc<AppConfig>>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let db = PostgrestClient::new(&state);

    let path = format!("/rest/v1/notifications?id=eq.{}", notification_id);
    let rows: Vec<Value> = db
        .request(Method::GET, &path, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if rows.is_empty() {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    let notification: Notification = serde_json::from_value(rows[0].clone())
        .map_err(|e| AppError::Internal(format!("Failed to parse notification: {}", e)))?;

    Ok(Json(json!(notification)))
}

pub async fn queue_stats(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let queue = RedisQueueService::from_config(&state)
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    let stats = queue
        .queue_stats()
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(json!(stats)))
}
