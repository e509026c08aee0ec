//! Queue seam between intake and the worker transport.
//!
//! [`JobQueue`] is the narrow trait intake publishes through; the
//! Postgres-backed [`PgJobQueue`] is the production implementation. The
//! transport owns redelivery; callers only enqueue.

use async_trait::async_trait;

use quoteframe_core::types::DbId;
use quoteframe_db::repositories::job_repo::{JobRepo, DEFAULT_MAX_ATTEMPTS};
use quoteframe_db::DbPool;

use crate::payload::GenerationJob;

/// Errors from enqueueing a job.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to serialize job payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Publish-side queue operations.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a generation job; returns the delivery handle.
    async fn enqueue(&self, job: &GenerationJob) -> Result<DbId, QueueError>;
}

/// Durable queue on the `jobs` table.
pub struct PgJobQueue {
    pool: DbPool,
}

impl PgJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: &GenerationJob) -> Result<DbId, QueueError> {
        let payload = serde_json::to_value(job)?;
        let row = JobRepo::enqueue(&self.pool, &payload, DEFAULT_MAX_ATTEMPTS).await?;
        tracing::debug!(
            job_id = row.id,
            generation_id = job.generation_id,
            "Enqueued generation job"
        );
        Ok(row.id)
    }
}
