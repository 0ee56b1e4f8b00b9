// libs/notification-cell/src/services/queue.rs
use chrono::Utc;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::{EmailJob, JobStatus, QueueStats};

const PENDING_QUEUE: &str = "notification_queue:pending";
const PROCESSING_QUEUE: &str = "notification_queue:processing";
const JOB_TTL_SECONDS: i64 = 604_800; // 7 days

pub struct RedisQueueService {
    pool: Pool,
}

impl RedisQueueService {
    /// Pool creation is synchronous; connections are established lazily.
    pub fn from_config(config: &AppConfig) -> Result<Self, NotificationError> {
        let redis_url = config
            .redis_url
            .clone()
            .ok_or_else(|| NotificationError::QueueError("REDIS_URL not configured".to_string()))?;

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| NotificationError::QueueError(format!("Pool creation error: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<(), NotificationError> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis notification queue reachable");
        Ok(())
    }

    pub async fn enqueue_job(&self, job: &EmailJob) -> Result<(), NotificationError> {
        let mut conn = self.get_connection().await?;

        let job_data = serde_json::to_string(job)?;
        let status_json = serde_json::to_string(&job.status)?;
        let created_at = job.created_at.to_rfc3339();
        let job_key = job_key(job.job_id);

        let _: () = conn
            .hset_multiple(
                &job_key,
                &[
                    ("data", job_data.as_str()),
                    ("status", status_json.as_str()),
                    ("created_at", created_at.as_str()),
                ],
            )
            .await?;
        let _: () = conn.expire(&job_key, JOB_TTL_SECONDS).await?;

        let _: () = conn.lpush(PENDING_QUEUE, job.job_id.to_string()).await?;

        debug!("Email job {} enqueued", job.job_id);
        Ok(())
    }

    /// Atomic move from the pending to the processing list; returns `None`
    /// when the queue stays empty past the poll timeout.
    pub async fn dequeue_job(&self, worker_id: &str) -> Result<Option<EmailJob>, NotificationError> {
        let mut conn = self.get_connection().await?;

        let job_id: Option<String> = conn
            .brpoplpush(PENDING_QUEUE, PROCESSING_QUEUE, 1.0)
            .await?;

        let Some(job_id_str) = job_id else {
            return Ok(None);
        };

        let job_data: Option<String> = conn.hget(job_key_str(&job_id_str), "data").await?;

        let Some(data) = job_data else {
            // Job hash expired while the id sat in the queue.
            let _: () = conn.lrem(PROCESSING_QUEUE, 1, &job_id_str).await?;
            return Ok(None);
        };

        let mut job: EmailJob = serde_json::from_str(&data)?;
        job.worker_id = Some(worker_id.to_string());
        job.status = JobStatus::Processing;
        job.updated_at = Utc::now();

        self.store_job(&mut conn, &job).await?;

        debug!("Email job {} dequeued by worker {}", job.job_id, worker_id);
        Ok(Some(job))
    }

    pub async fn update_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<EmailJob, NotificationError> {
        let mut conn = self.get_connection().await?;

        let job_data: Option<String> = conn.hget(job_key(job_id), "data").await?;
        let Some(data) = job_data else {
            return Err(NotificationError::JobNotFound(job_id.to_string()));
        };

        let mut job: EmailJob = serde_json::from_str(&data)?;

        if !job.status.can_transition_to(&status) {
            return Err(NotificationError::InvalidStatusTransition {
                from: format!("{:?}", job.status),
                to: format!("{:?}", status),
            });
        }

        job.status = status.clone();
        job.updated_at = Utc::now();
        job.error_message = error_message;

        if status.is_terminal() {
            job.completed_at = Some(Utc::now());
            let _: () = conn.lrem(PROCESSING_QUEUE, 1, job_id.to_string()).await?;
        }

        self.store_job(&mut conn, &job).await?;
        Ok(job)
    }

    /// Push a failed job back onto the pending list for another attempt.
    pub async fn requeue_job(&self, job: &mut EmailJob) -> Result<(), NotificationError> {
        let mut conn = self.get_connection().await?;

        job.retry_count += 1;
        job.status = JobStatus::Retrying;
        job.updated_at = Utc::now();

        self.store_job(&mut conn, job).await?;

        let _: () = conn.lrem(PROCESSING_QUEUE, 1, job.job_id.to_string()).await?;
        let _: () = conn.lpush(PENDING_QUEUE, job.job_id.to_string()).await?;

        debug!(
            "Email job {} requeued (attempt {}/{})",
            job.job_id, job.retry_count, job.max_retries
        );
        Ok(())
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<EmailJob>, NotificationError> {
        let mut conn = self.get_connection().await?;

        let job_data: Option<String> = conn.hget(job_key(job_id), "data").await?;
        match job_data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, NotificationError> {
        let mut conn = self.get_connection().await?;

        let queued_jobs: u64 = conn.llen(PENDING_QUEUE).await?;
        let processing_jobs: u64 = conn.llen(PROCESSING_QUEUE).await?;

        Ok(QueueStats {
            queued_jobs,
            processing_jobs,
        })
    }

    async fn get_connection(&self) -> Result<Connection, NotificationError> {
        self.pool
            .get()
            .await
            .map_err(|e| NotificationError::QueueError(format!("Connection error: {}", e)))
    }

    async fn store_job(
        &self,
        conn: &mut Connection,
        job: &EmailJob,
    ) -> Result<(), NotificationError> {
        let job_data = serde_json::to_string(job)?;
        let status_json = serde_json::to_string(&job.status)?;
        let job_key = job_key(job.job_id);

        let _: () = conn
            .hset_multiple(
                &job_key,
                &[
                    ("data", job_data.as_str()),
                    ("status", status_json.as_str()),
                ],
            )
            .await?;
        let _: () = conn.expire(&job_key, JOB_TTL_SECONDS).await?;

        Ok(())
    }
}

fn job_key(job_id: Uuid) -> String {
    format!("notification_job:{}", job_id)
}

fn job_key_str(job_id: &str) -> String {
    format!("notification_job:{}", job_id)
}
