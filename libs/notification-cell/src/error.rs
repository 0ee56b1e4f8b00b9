use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Queue operation failed: {0}")]
    QueueError(String),

    #[error("Email job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Maximum retry attempts ({max_retries}) exceeded for job {job_id}")]
    MaxRetriesExceeded { job_id: String, max_retries: u32 },

    #[error("Email delivery failed: {0}")]
    EmailError(String),
}
