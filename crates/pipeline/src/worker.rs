//! The delivery-side handler: one queued job in, one settled attempt out.
//!
//! [`JobWorker::process`] is the only writer of generation/quote terminal
//! states and of `image_url`. Error classification follows a strict rule:
//! database errors propagate (the queue redelivers), everything else is
//! written as a terminal FAILED so redelivery cannot double-post.

use std::sync::Arc;

use chrono::Utc;

use quoteframe_chat::api::{ChatApi, ChatError};
use quoteframe_core::entitlement::{period_start, requires_watermark, PlanTier};
use quoteframe_core::imageops::finalize_image;
use quoteframe_core::status::{GenerationStatus, CONTENT_POLICY_DECLINED};
use quoteframe_db::models::generation::Generation;
use quoteframe_db::models::workspace::Workspace;
use quoteframe_db::repositories::generation_repo::GenerationRepo;
use quoteframe_db::repositories::quote_repo::QuoteRepo;
use quoteframe_db::repositories::style_repo::StyleRepo;
use quoteframe_db::repositories::usage_repo::UsageRepo;
use quoteframe_db::repositories::workspace_repo::WorkspaceRepo;
use quoteframe_db::DbPool;
use quoteframe_events::bus::event_types;
use quoteframe_events::{EventBus, PipelineEvent};
use quoteframe_imagen::model::resolve_bytes;
use quoteframe_imagen::{ArtifactGenerator, ImageModel};

use crate::blob::BlobStore;
use crate::intake::{DONE_REACTION, PENDING_REACTION};
use crate::payload::GenerationJob;

/// Reply posted when both generation attempts were declined.
const DECLINE_REPLY: &str =
    "This one was too powerful for art. Saved as a text-only quote.";

/// How one delivery ended. All variants settle the job; only a
/// [`WorkerError`] leaves it to the queue to redeliver.
#[derive(Debug, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Artifact posted, records completed, quota committed.
    Completed,
    /// Content policy declined twice; text-only reply posted.
    Declined,
    /// Terminal processing failure, captured on the generation.
    Failed,
    /// The generation was already settled (redelivered job).
    Skipped,
}

/// Errors that abort delivery without settling the attempt. The queue's
/// redelivery is the retry path for these.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Processes queued generation jobs.
pub struct JobWorker<M, C, B> {
    pool: DbPool,
    generator: ArtifactGenerator<M>,
    chat: C,
    blob: B,
    bus: Arc<EventBus>,
}

impl<M, C, B> JobWorker<M, C, B>
where
    M: ImageModel,
    C: ChatApi,
    B: BlobStore,
{
    pub fn new(pool: DbPool, model: M, chat: C, blob: B, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            generator: ArtifactGenerator::new(model),
            chat,
            blob,
            bus,
        }
    }

    /// Handle one delivery end to end.
    pub async fn process(&self, job: &GenerationJob) -> Result<WorkerOutcome, WorkerError> {
        let Some(generation) = GenerationRepo::find_by_id(&self.pool, job.generation_id).await?
        else {
            tracing::warn!(generation_id = job.generation_id, "Job references no generation");
            return Ok(WorkerOutcome::Skipped);
        };

        // Idempotency guard: a redelivered job for a settled attempt is a
        // no-op, so at-least-once delivery never double-posts.
        if GenerationStatus::parse(&generation.status).is_some_and(|s| s.is_terminal()) {
            tracing::info!(
                generation_id = generation.id,
                status = %generation.status,
                "Generation already settled, skipping redelivery"
            );
            return Ok(WorkerOutcome::Skipped);
        }

        let Some(workspace) = WorkspaceRepo::find_by_id(&self.pool, job.workspace_id).await? else {
            tracing::warn!(workspace_id = job.workspace_id, "Job references no workspace");
            return Ok(WorkerOutcome::Skipped);
        };

        GenerationRepo::mark_processing(&self.pool, generation.id).await?;
        // Only the quote's first attempt drives its status. A regrant on
        // an already-completed quote must not drag it back through
        // processing, where a failed attempt would strand it.
        if generation.attempt_number == 1 {
            QuoteRepo::mark_processing(&self.pool, job.quote_id).await?;
        }

        let template = match self.resolve_template(job).await? {
            Some(template) => template,
            None => {
                return self
                    .settle_failed(job, &generation, "no style template resolvable")
                    .await;
            }
        };

        let artifact = match self
            .generator
            .generate(
                &job.quote_text,
                &template,
                job.style_override.as_deref(),
                job.output_size as u32,
                &job.quality,
            )
            .await
        {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return self.settle_declined(job, &generation, &workspace).await,
            Err(e) => {
                return self.settle_failed(job, &generation, &e.to_string()).await;
            }
        };

        let raw = match resolve_bytes(artifact.image).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return self.settle_failed(job, &generation, &e.to_string()).await;
            }
        };

        // Watermark decision uses live usage, not enqueue-time usage:
        // only paid-tier or bonus-funded outputs skip it.
        let tier = PlanTier::parse(&job.plan_tier).unwrap_or(PlanTier::Free);
        let used = UsageRepo::quotes_used(&self.pool, workspace.id, period_start(Utc::now())).await?;
        let watermark = requires_watermark(tier, used, workspace.monthly_quota);

        let png = match finalize_image(&raw, job.output_size as u32, watermark) {
            Ok(png) => png,
            Err(e) => {
                return self.settle_failed(job, &generation, &e.to_string()).await;
            }
        };

        let image_url = match self.blob.upload(&png, job.workspace_id, job.quote_id).await {
            Ok(url) => url,
            Err(e) => {
                return self.settle_failed(job, &generation, &e.to_string()).await;
            }
        };

        let reply_channel = job
            .reply_channel_id
            .as_deref()
            .unwrap_or(&job.platform_channel_id);
        if let Err(e) = self
            .chat
            .post_thread_reply(
                &workspace.bot_token,
                reply_channel,
                &job.source_message_id,
                &reply_text(job),
                Some(&image_url),
            )
            .await
        {
            self.note_auth_revoked(&workspace, &e).await;
            return self.settle_failed(job, &generation, &e.to_string()).await;
        }

        self.swap_reactions(&workspace, job).await;

        GenerationRepo::complete(&self.pool, generation.id, &image_url, &artifact.prompt).await?;
        QuoteRepo::complete(&self.pool, job.quote_id, &image_url, job.style_id).await?;

        // Quota is consumed only here, on a fully delivered artifact.
        let usage =
            UsageRepo::increment(&self.pool, workspace.id, period_start(Utc::now())).await?;

        self.bus.publish(
            PipelineEvent::new(event_types::GENERATION_COMPLETED)
                .with_source("generation", generation.id)
                .with_payload(serde_json::json!({
                    "image_url": image_url,
                    "quotes_used": usage.quotes_used,
                })),
        );

        tracing::info!(
            generation_id = generation.id,
            quote_id = job.quote_id,
            "Artifact delivered"
        );
        Ok(WorkerOutcome::Completed)
    }

    /// The style template for this attempt. `None` only when the payload
    /// names neither an override nor a resolvable style.
    async fn resolve_template(&self, job: &GenerationJob) -> Result<Option<String>, sqlx::Error> {
        if job.style_override.is_some() {
            // build_prompt ignores the template when an override is set.
            return Ok(Some(String::new()));
        }
        let Some(style_id) = job.style_id else {
            return Ok(None);
        };
        Ok(StyleRepo::find_by_id(&self.pool, style_id)
            .await?
            .map(|s| s.prompt_template))
    }

    /// Both attempts policy-declined: acknowledge with a text-only reply
    /// and settle with the sentinel reason. No quota is consumed.
    async fn settle_declined(
        &self,
        job: &GenerationJob,
        generation: &Generation,
        workspace: &Workspace,
    ) -> Result<WorkerOutcome, WorkerError> {
        let reply_channel = job
            .reply_channel_id
            .as_deref()
            .unwrap_or(&job.platform_channel_id);
        if let Err(e) = self
            .chat
            .post_thread_reply(
                &workspace.bot_token,
                reply_channel,
                &job.source_message_id,
                &format!("{DECLINE_REPLY}\n>{}", job.quote_text),
                None,
            )
            .await
        {
            self.note_auth_revoked(workspace, &e).await;
            tracing::warn!(error = %e, "Failed to post decline acknowledgment");
        }

        GenerationRepo::fail(&self.pool, generation.id, CONTENT_POLICY_DECLINED).await?;
        if generation.attempt_number == 1 {
            QuoteRepo::fail(&self.pool, job.quote_id).await?;
        }

        self.bus.publish(
            PipelineEvent::new(event_types::GENERATION_DECLINED)
                .with_source("generation", generation.id)
                .with_payload(serde_json::json!({"quote_id": job.quote_id})),
        );

        tracing::info!(generation_id = generation.id, "Generation declined by content policy");
        Ok(WorkerOutcome::Declined)
    }

    /// Terminal non-policy failure: capture the message on the attempt
    /// (and on the quote when this is its only attempt).
    async fn settle_failed(
        &self,
        job: &GenerationJob,
        generation: &Generation,
        error: &str,
    ) -> Result<WorkerOutcome, WorkerError> {
        GenerationRepo::fail(&self.pool, generation.id, error).await?;
        if generation.attempt_number == 1 {
            QuoteRepo::fail(&self.pool, job.quote_id).await?;
        }

        self.bus.publish(
            PipelineEvent::new(event_types::GENERATION_FAILED)
                .with_source("generation", generation.id)
                .with_payload(serde_json::json!({"error": error})),
        );

        tracing::error!(
            generation_id = generation.id,
            error,
            "Generation failed"
        );
        Ok(WorkerOutcome::Failed)
    }

    /// Swap the in-flight reaction for the done one. Cosmetic; failures
    /// are logged and never escalate.
    async fn swap_reactions(&self, workspace: &Workspace, job: &GenerationJob) {
        for (action, result) in [
            (
                "remove",
                self.chat
                    .remove_reaction(
                        &workspace.bot_token,
                        &job.platform_channel_id,
                        &job.source_message_id,
                        PENDING_REACTION,
                    )
                    .await,
            ),
            (
                "add",
                self.chat
                    .add_reaction(
                        &workspace.bot_token,
                        &job.platform_channel_id,
                        &job.source_message_id,
                        DONE_REACTION,
                    )
                    .await,
            ),
        ] {
            if let Err(e) = result {
                tracing::debug!(error = %e, action, "Reaction update failed");
            }
        }
    }

    /// A revoked credential flags the workspace for reconnection.
    async fn note_auth_revoked(&self, workspace: &Workspace, error: &ChatError) {
        if matches!(error, ChatError::AuthRevoked(_)) {
            if let Err(db_err) =
                WorkspaceRepo::set_needs_reconnection(&self.pool, workspace.id, true).await
            {
                tracing::error!(
                    workspace_id = workspace.id,
                    error = %db_err,
                    "Failed to flag workspace for reconnection"
                );
            }
        }
    }
}

/// The thread reply accompanying a finished artifact.
fn reply_text(job: &GenerationJob) -> String {
    match job.attributed_to.as_deref() {
        Some(who) => format!("\u{201c}{}\u{201d} \u{2014} {who}", job.quote_text),
        None => format!("\u{201c}{}\u{201d}", job.quote_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_includes_attribution_when_known() {
        let job = GenerationJob {
            workspace_id: 1,
            channel_id: 1,
            quote_id: 1,
            generation_id: 1,
            platform_channel_id: "C1".into(),
            reply_channel_id: None,
            source_message_id: "1.0".into(),
            quote_text: "less is more".into(),
            attributed_to: Some("Mies".into()),
            style_id: Some(1),
            style_override: None,
            plan_tier: "free".into(),
            output_size: 1024,
            quality: "standard".into(),
        };
        assert_eq!(reply_text(&job), "\u{201c}less is more\u{201d} \u{2014} Mies");

        let anonymous = GenerationJob {
            attributed_to: None,
            ..job
        };
        assert_eq!(reply_text(&anonymous), "\u{201c}less is more\u{201d}");
    }
}
