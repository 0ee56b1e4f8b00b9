// libs/notification-cell/src/services/dispatcher.rs
//
// Fire-and-forget side channel for appointment events. Every dispatch writes
// a notification row (the outbox) and enqueues an email job; no failure here
// ever reaches the caller, so a booking or cancellation can never be rolled
// back by notification trouble.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::error::NotificationError;
use crate::models::{EmailJob, NotificationType};
use crate::services::queue::RedisQueueService;

struct Recipient {
    email: String,
    name: String,
}

pub struct NotificationDispatcher {
    db: PostgrestClient,
    queue: Option<Arc<RedisQueueService>>,
}

impl NotificationDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        let queue = if config.is_queue_configured() {
            match RedisQueueService::from_config(config) {
                Ok(queue) => Some(Arc::new(queue)),
                Err(e) => {
                    warn!("Notification queue unavailable, outbox-only mode: {}", e);
                    None
                }
            }
        } else {
            debug!("No notification queue configured, outbox-only mode");
            None
        };

        Self {
            db: PostgrestClient::new(config),
            queue,
        }
    }

    pub async fn appointment_booked(
        &self,
        appointment_id: Uuid,
        parent_id: Uuid,
        teacher_id: Uuid,
    ) {
        self.dispatch_to_both(
            appointment_id,
            parent_id,
            teacher_id,
            NotificationType::AppointmentConfirmation,
            "Appointment booked",
            "A parent-teacher appointment has been booked and is awaiting confirmation.",
        )
        .await;
    }

    pub async fn appointment_cancelled(
        &self,
        appointment_id: Uuid,
        parent_id: Uuid,
        teacher_id: Uuid,
    ) {
        self.dispatch_to_both(
            appointment_id,
            parent_id,
            teacher_id,
            NotificationType::AppointmentCancellation,
            "Appointment cancelled",
            "A parent-teacher appointment has been cancelled and the time slot is available again.",
        )
        .await;
    }

    pub async fn appointment_status_changed(
        &self,
        appointment_id: Uuid,
        parent_id: Uuid,
        teacher_id: Uuid,
        new_status: &str,
    ) {
        let body = format!(
            "The status of a parent-teacher appointment changed to '{}'.",
            new_status
        );
        self.dispatch_to_both(
            appointment_id,
            parent_id,
            teacher_id,
            NotificationType::AppointmentStatusUpdate,
            "Appointment status updated",
            &body,
        )
        .await;
    }

    async fn dispatch_to_both(
        &self,
        appointment_id: Uuid,
        parent_id: Uuid,
        teacher_id: Uuid,
        notification_type: NotificationType,
        subject: &str,
        body: &str,
    ) {
        for (profile_table, profile_id) in [("parents", parent_id), ("teachers", teacher_id)] {
            match self.resolve_recipient(profile_table, profile_id).await {
                Ok(recipient) => {
                    if let Err(e) = self
                        .dispatch_one(
                            appointment_id,
                            &recipient,
                            notification_type.clone(),
                            subject,
                            body,
                        )
                        .await
                    {
                        warn!(
                            "Notification dispatch failed for {} {}: {}",
                            profile_table, profile_id, e
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        "Could not resolve notification recipient for {} {}: {}",
                        profile_table, profile_id, e
                    );
                }
            }
        }
    }

    async fn dispatch_one(
        &self,
        appointment_id: Uuid,
        recipient: &Recipient,
        notification_type: NotificationType,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        let notification_id = Uuid::new_v4();
        let now = Utc::now();

        let record = json!({
            "id": notification_id,
            "recipient_email": recipient.email,
            "recipient_name": recipient.name,
            "notification_type": notification_type.to_string(),
            "status": "pending",
            "subject": subject,
            "content": body,
            "appointment_id": appointment_id,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let _: Vec<Value> = self
            .db
            .request(Method::POST, "/rest/v1/notifications", Some(record))
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        if let Some(queue) = &self.queue {
            let job = EmailJob::new(
                notification_id,
                recipient.email.clone(),
                recipient.name.clone(),
                subject.to_string(),
                body.to_string(),
            );
            queue.enqueue_job(&job).await?;
            debug!(
                "Notification {} queued for {} as job {}",
                notification_id, recipient.email, job.job_id
            );
        } else {
            debug!(
                "Notification {} stored without queue (outbox-only mode)",
                notification_id
            );
        }

        Ok(())
    }

    /// Walk profile → user to find the email address to notify.
    async fn resolve_recipient(
        &self,
        profile_table: &str,
        profile_id: Uuid,
    ) -> Result<Recipient, NotificationError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=user_id", profile_table, profile_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let user_id = rows
            .first()
            .and_then(|row| row.get("user_id"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                NotificationError::DatabaseError(format!(
                    "No {} profile found for {}",
                    profile_table, profile_id
                ))
            })?
            .to_string();

        let path = format!("/rest/v1/users?id=eq.{}&select=email,full_name", user_id);
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let row = rows.first().ok_or_else(|| {
            NotificationError::DatabaseError(format!("No user record for {}", user_id))
        })?;

        Ok(Recipient {
            email: row
                .get("email")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            name: row
                .get("full_name")
                .and_then(|v| v.as_str())
                .unwrap_or("there")
                .to_string(),
        })
    }
}
