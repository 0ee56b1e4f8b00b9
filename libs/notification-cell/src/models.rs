// libs/notification-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// NOTIFICATION RECORDS (OUTBOX)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AppointmentConfirmation,
    AppointmentCancellation,
    AppointmentStatusUpdate,
    AppointmentReminder,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::AppointmentConfirmation => write!(f, "appointment_confirmation"),
            NotificationType::AppointmentCancellation => write!(f, "appointment_cancellation"),
            NotificationType::AppointmentStatusUpdate => write!(f, "appointment_status_update"),
            NotificationType::AppointmentReminder => write!(f, "appointment_reminder"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Persistent notification log row. Written transactionally-adjacent to the
/// appointment mutation (outbox); delivery happens later from the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_email: String,
    pub recipient_name: String,
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub subject: String,
    pub content: Option<String>,
    pub appointment_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// EMAIL JOBS (REDIS QUEUE)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    Queued,
    Processing,
    Retrying,
    Sent,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, target: &JobStatus) -> bool {
        use JobStatus::*;
        match (self, target) {
            (Queued, Processing) => true,
            (Retrying, Processing) => true,
            (Processing, Sent) => true,
            (Processing, Retrying) => true,
            (Processing, Failed) => true,
            (Retrying, Failed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub job_id: Uuid,
    pub notification_id: Uuid,
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub status: JobStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub worker_id: Option<String>,
}

impl EmailJob {
    pub fn new(
        notification_id: Uuid,
        recipient_email: String,
        recipient_name: String,
        subject: String,
        body: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            notification_id,
            recipient_email,
            recipient_name,
            subject,
            body,
            status: JobStatus::Queued,
            retry_count: 0,
            max_retries: 3,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error_message: None,
            worker_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued_jobs: u64,
    pub processing_jobs: u64,
}
