//! The worker process: claims queued jobs and drives them through the
//! generation pipeline.
//!
//! The claim loop owns queue-level concerns (polling, redelivery backoff,
//! dead-lettering); [`JobWorker`] owns everything about an individual
//! attempt. A job that fails with a database error is rescheduled with
//! exponential backoff until its attempt cap runs out.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use quoteframe_chat::api::ChatApi;
use quoteframe_db::repositories::job_repo::JobRepo;
use quoteframe_db::DbPool;
use quoteframe_imagen::ImageModel;
use quoteframe_pipeline::blob::BlobStore;
use quoteframe_pipeline::payload::GenerationJob;
use quoteframe_pipeline::worker::JobWorker;

/// Idle poll interval when the queue is empty.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// First redelivery delay; doubles per attempt.
const BASE_DELAY_SECS: i64 = 30;

/// Redelivery delay ceiling.
const MAX_DELAY_SECS: i64 = 3600;

/// Exponential backoff for the nth delivery attempt (1-based).
fn backoff_delay(attempts: i32) -> i64 {
    let shift = attempts.saturating_sub(1).clamp(0, 20) as u32;
    (BASE_DELAY_SECS << shift).min(MAX_DELAY_SECS)
}

/// Run the claim loop until cancelled.
pub async fn run<M, C, B>(pool: DbPool, worker: JobWorker<M, C, B>, cancel: CancellationToken)
where
    M: ImageModel,
    C: ChatApi,
    B: BlobStore,
{
    tracing::info!("Worker claim loop started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Worker shutting down");
                break;
            }
            claimed = JobRepo::claim_next(&pool) => {
                match claimed {
                    Ok(Some(job)) => deliver(&pool, &worker, job).await,
                    Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to claim next job");
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                }
            }
        }
    }
}

/// Deliver one claimed job and settle it with the queue.
async fn deliver<M, C, B>(
    pool: &DbPool,
    worker: &JobWorker<M, C, B>,
    job: quoteframe_db::models::job::Job,
) where
    M: ImageModel,
    C: ChatApi,
    B: BlobStore,
{
    let payload: GenerationJob = match serde_json::from_value(job.payload.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            // An unreadable payload will never succeed; dead-letter it.
            tracing::error!(job_id = job.id, error = %e, "Unparseable job payload");
            if let Err(db_err) =
                JobRepo::exhaust(pool, job.id, &format!("unparseable payload: {e}")).await
            {
                tracing::error!(job_id = job.id, error = %db_err, "Failed to dead-letter job");
            }
            return;
        }
    };

    match worker.process(&payload).await {
        Ok(outcome) => {
            tracing::debug!(job_id = job.id, outcome = ?outcome, "Delivery finished");
            if let Err(e) = JobRepo::complete(pool, job.id).await {
                tracing::error!(job_id = job.id, error = %e, "Failed to complete job");
            }
        }
        Err(e) => {
            let message = e.to_string();
            if job.attempts >= job.max_attempts {
                tracing::error!(
                    job_id = job.id,
                    attempts = job.attempts,
                    error = %message,
                    "Delivery attempts exhausted, dead-lettering"
                );
                if let Err(db_err) = JobRepo::exhaust(pool, job.id, &message).await {
                    tracing::error!(job_id = job.id, error = %db_err, "Failed to dead-letter job");
                }
            } else {
                let delay = backoff_delay(job.attempts);
                tracing::warn!(
                    job_id = job.id,
                    attempts = job.attempts,
                    delay_secs = delay,
                    error = %message,
                    "Delivery failed, rescheduling"
                );
                if let Err(db_err) = JobRepo::reschedule(pool, job.id, &message, delay).await {
                    tracing::error!(job_id = job.id, error = %db_err, "Failed to reschedule job");
                }
            }
        }
    }
}
