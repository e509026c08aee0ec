//! Repository for the `jobs` table: the durable work queue.
//!
//! Delivery is at-least-once. `claim_next` uses `FOR UPDATE SKIP LOCKED`
//! so concurrent worker processes never double-claim; retry/backoff is
//! owned here (reschedule with a later `next_attempt_at`), not by the
//! application code that enqueued the job.

use sqlx::PgPool;

use quoteframe_core::types::DbId;

use crate::models::job::{job_status, Job};

/// Column list for `jobs` queries.
const COLUMNS: &str = "id, payload, status, attempts, max_attempts, \
    next_attempt_at, locked_at, last_error, created_at, updated_at";

/// Default delivery attempt cap.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Provides enqueue/claim/settle operations for queued jobs.
pub struct JobRepo;

impl JobRepo {
    /// Enqueue a payload for delivery. Returns the job row; its id is the
    /// opaque delivery handle.
    pub async fn enqueue(
        pool: &PgPool,
        payload: &serde_json::Value,
        max_attempts: i32,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (payload, max_attempts) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(payload)
            .bind(max_attempts)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the next due job.
    ///
    /// Increments `attempts` on claim so a worker crash mid-job still
    /// counts against the cap when the transport redelivers.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status = $1, locked_at = NOW(), attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status = $2 AND next_attempt_at <= NOW() \
                 ORDER BY next_attempt_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_status::RUNNING)
            .bind(job_status::PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Mark a delivery as handled. The worker's own terminal-state writes
    /// carry the outcome; the queue only cares that delivery finished.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status = $2, locked_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(job_status::COMPLETED)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Requeue a failed delivery with a backoff delay.
    pub async fn reschedule(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
        delay_secs: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET status = $2, locked_at = NULL, last_error = $3, \
                 next_attempt_at = NOW() + make_interval(secs => $4), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(job_status::PENDING)
        .bind(error)
        .bind(delay_secs as f64)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Dead-letter a job whose attempt cap is used up.
    pub async fn exhaust(pool: &PgPool, job_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs \
             SET status = $2, locked_at = NULL, last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(job_status::EXHAUSTED)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }
}
