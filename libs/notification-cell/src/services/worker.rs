// libs/notification-cell/src/services/worker.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::error::NotificationError;
use crate::models::{EmailJob, JobStatus};
use crate::services::email::EmailClient;
use crate::services::queue::RedisQueueService;

pub struct NotificationWorkerService {
    worker_id: String,
    worker_count: usize,
    queue: Arc<RedisQueueService>,
    db: Arc<PostgrestClient>,
    email: Arc<EmailClient>,
    is_shutdown: Arc<tokio::sync::RwLock<bool>>,
}

impl NotificationWorkerService {
    pub fn new(config: &AppConfig, queue: Arc<RedisQueueService>) -> Self {
        Self {
            worker_id: format!("notify-worker-{}", uuid::Uuid::new_v4()),
            worker_count: config.notification_worker_count.max(1),
            queue,
            db: Arc::new(PostgrestClient::new(config)),
            email: Arc::new(EmailClient::new(config)),
            is_shutdown: Arc::new(tokio::sync::RwLock::new(false)),
        }
    }

    /// Run the worker loops until shutdown. Individual job failures retry
    /// with backoff; only the Redis connection dying ends a loop.
    pub async fn start(&self) -> Result<(), NotificationError> {
        info!(
            "Starting notification worker {} with {} loops",
            self.worker_id, self.worker_count
        );

        self.queue.ping().await?;

        let mut handles = Vec::new();
        for i in 0..self.worker_count {
            let worker_name = format!("{}-{}", self.worker_id, i);
            let queue = Arc::clone(&self.queue);
            let db = Arc::clone(&self.db);
            let email = Arc::clone(&self.email);
            let is_shutdown = Arc::clone(&self.is_shutdown);

            handles.push(tokio::spawn(async move {
                worker_loop(worker_name, queue, db, email, is_shutdown).await;
            }));
        }

        futures::future::join_all(handles).await;
        Ok(())
    }

    pub async fn shutdown(&self) {
        info!("Shutting down notification worker {}", self.worker_id);
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }
}

async fn worker_loop(
    worker_name: String,
    queue: Arc<RedisQueueService>,
    db: Arc<PostgrestClient>,
    email: Arc<EmailClient>,
    is_shutdown: Arc<tokio::sync::RwLock<bool>>,
) {
    debug!("Notification worker loop started: {}", worker_name);

    loop {
        if *is_shutdown.read().await {
            debug!("Worker {} received shutdown signal", worker_name);
            break;
        }

        match queue.dequeue_job(&worker_name).await {
            Ok(Some(job)) => {
                if let Err(e) = process_job(&queue, &db, &email, job).await {
                    error!("Worker {} failed to process job: {}", worker_name, e);
                }
            }
            Ok(None) => {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Err(e) => {
                error!("Worker {} failed to dequeue: {}", worker_name, e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }

    debug!("Notification worker loop ended: {}", worker_name);
}

async fn process_job(
    queue: &RedisQueueService,
    db: &PostgrestClient,
    email: &EmailClient,
    mut job: EmailJob,
) -> Result<(), NotificationError> {
    debug!(
        "Processing email job {} for {} (attempt {}/{})",
        job.job_id,
        job.recipient_email,
        job.retry_count + 1,
        job.max_retries
    );

    match email
        .send(
            &job.recipient_email,
            &job.recipient_name,
            &job.subject,
            &job.body,
        )
        .await
    {
        Ok(()) => {
            queue
                .update_job_status(job.job_id, JobStatus::Sent, None)
                .await?;
            mark_notification(db, &job, "sent", None).await;
            info!("Email job {} delivered to {}", job.job_id, job.recipient_email);
            Ok(())
        }
        Err(e) => {
            warn!("Email job {} delivery failed: {}", job.job_id, e);

            if job.retry_count + 1 >= job.max_retries {
                queue
                    .update_job_status(job.job_id, JobStatus::Failed, Some(e.to_string()))
                    .await?;
                mark_notification(db, &job, "failed", Some(&e.to_string())).await;
                return Err(NotificationError::MaxRetriesExceeded {
                    job_id: job.job_id.to_string(),
                    max_retries: job.max_retries,
                });
            }

            // Exponential backoff before the job re-enters the pending list.
            let backoff = Duration::from_millis(500 * 2u64.pow(job.retry_count));
            tokio::time::sleep(backoff).await;

            job.error_message = Some(e.to_string());
            queue.requeue_job(&mut job).await?;
            Ok(())
        }
    }
}

/// Outbox bookkeeping is best-effort; a failed PATCH only logs.
async fn mark_notification(
    db: &PostgrestClient,
    job: &EmailJob,
    status: &str,
    error_message: Option<&str>,
) {
    let mut update = json!({
        "status": status,
        "updated_at": Utc::now().to_rfc3339()
    });

    if status == "sent" {
        update["sent_at"] = json!(Utc::now().to_rfc3339());
    }
    if let Some(message) = error_message {
        update["error_message"] = json!(message);
    }

    let path = format!("/rest/v1/notifications?id=eq.{}", job.notification_id);
    if let Err(e) = db
        .request::<Vec<Value>>(Method::PATCH, &path, Some(update))
        .await
    {
        warn!(
            "Failed to update notification {} to {}: {}",
            job.notification_id, status, e
        );
    }
}
