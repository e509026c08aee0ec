//! Intake orchestration: everything that happens between a normalized
//! chat event and a queued generation job.
//!
//! Ordering matters and is load-bearing:
//!
//! 1. workspace lookup and stateless filters (cheapest first)
//! 2. channel resolution, lazily creating within the tier ceiling
//! 3. mention-in-thread branch (regrant, see `regrant.rs`)
//! 4. entitlement gate, before the paid detector call
//! 5. detection, style selection
//! 6. transactional quote + first-generation creation (idempotency anchor)
//! 7. enqueue, outside the transaction
//!
//! Quota is only checked here, never committed; consumption is recorded
//! by the worker on successful completion.

use std::sync::Arc;

use chrono::Utc;

use quoteframe_chat::api::{ChatApi, ChatError};
use quoteframe_core::entitlement::{decide, period_start, PlanTier};
use quoteframe_core::event::{pre_filter, ChatEvent, FilterReason};
use quoteframe_core::style::{select_style, StyleMode};
use quoteframe_core::types::DbId;
use quoteframe_db::models::channel::Channel;
use quoteframe_db::models::quote::CreateQuote;
use quoteframe_db::models::workspace::Workspace;
use quoteframe_db::repositories::channel_repo::ChannelRepo;
use quoteframe_db::repositories::generation_repo::GenerationRepo;
use quoteframe_db::repositories::quote_repo::QuoteRepo;
use quoteframe_db::repositories::usage_repo::UsageRepo;
use quoteframe_db::repositories::workspace_repo::WorkspaceRepo;
use quoteframe_db::{is_unique_violation, DbPool};
use quoteframe_events::bus::event_types;
use quoteframe_events::{EventBus, PipelineEvent};

use crate::detector::{QuoteDetector, StyleCandidate};
use crate::payload::GenerationJob;
use crate::queue::{JobQueue, QueueError};

/// Reaction added to the source message while an attempt is in flight.
pub const PENDING_REACTION: &str = "hourglass_flowing_sand";

/// Reaction swapped in when the artifact has been posted.
pub const DONE_REACTION: &str = "frame_with_picture";

/// Ephemeral notice shown when the monthly allowance is used up.
const QUOTA_EXHAUSTED_NOTICE: &str =
    "You've used this month's QuoteFrame allowance. It resets on the 1st.";

/// Errors from intake processing. Chat-side failures are best-effort and
/// never surface here.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// What intake did with an event. Every variant is an ack; the webhook
/// handler never retries based on these.
#[derive(Debug)]
pub enum IntakeOutcome {
    /// Dropped by a stateless filter.
    Filtered(FilterReason),
    /// No active workspace for the event's team.
    UnknownWorkspace,
    /// Channel exists but monitoring is off or paused.
    ChannelInactive,
    /// Channel would be new but the tier's ceiling is reached.
    ChannelCeilingReached,
    /// Monthly allowance used up; the author was notified ephemerally.
    QuotaExhausted,
    /// The detector classified the message as not a quote.
    NotAQuote,
    /// The detector call failed; the event is dropped, nothing recorded.
    DetectionFailed,
    /// The channel has no enabled styles to select from.
    NoStylesEnabled,
    /// A quote for this source message already exists (redelivery).
    AlreadyHandled,
    /// A mention in an existing thread, handled by the regrant path.
    Mention(crate::regrant::MentionOutcome),
    /// Quote and first generation created, job queued.
    Enqueued {
        quote_id: DbId,
        generation_id: DbId,
        job_id: DbId,
    },
}

/// The intake orchestrator. Generic over its three external seams so
/// tests can substitute fakes.
pub struct PipelineIntake<D, Q, C> {
    pub(crate) pool: DbPool,
    pub(crate) detector: D,
    pub(crate) queue: Q,
    pub(crate) chat: C,
    pub(crate) bus: Arc<EventBus>,
}

impl<D, Q, C> PipelineIntake<D, Q, C>
where
    D: QuoteDetector,
    Q: JobQueue,
    C: ChatApi,
{
    pub fn new(pool: DbPool, detector: D, queue: Q, chat: C, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            detector,
            queue,
            chat,
            bus,
        }
    }

    /// Process one normalized event end to end.
    pub async fn handle(&self, event: &ChatEvent) -> Result<IntakeOutcome, IntakeError> {
        let Some(workspace) = WorkspaceRepo::find_by_team_id(&self.pool, &event.team_id).await?
        else {
            return Ok(IntakeOutcome::UnknownWorkspace);
        };
        // A revoked credential means every chat call downstream would
        // fail; treat the workspace like an inactive one until it
        // reconnects.
        if !workspace.is_active || workspace.needs_reconnection {
            return Ok(IntakeOutcome::UnknownWorkspace);
        }

        if let Some(reason) = pre_filter(event, &workspace.bot_user_id) {
            return Ok(IntakeOutcome::Filtered(reason));
        }

        let channel = match self.resolve_channel(&workspace, &event.channel_id).await? {
            ChannelResolution::Ready(channel) => channel,
            ChannelResolution::Inactive => return Ok(IntakeOutcome::ChannelInactive),
            ChannelResolution::CeilingReached => return Ok(IntakeOutcome::ChannelCeilingReached),
        };

        // A surviving thread reply necessarily mentions the bot: regrant.
        if event.is_thread_reply() {
            let outcome = self.handle_mention(event, &workspace, &channel).await?;
            return Ok(IntakeOutcome::Mention(outcome));
        }

        if !self.check_entitlement(&workspace, event).await? {
            return Ok(IntakeOutcome::QuotaExhausted);
        }

        let styles = ChannelRepo::enabled_styles(&self.pool, channel.id).await?;
        if styles.is_empty() {
            return Ok(IntakeOutcome::NoStylesEnabled);
        }
        let candidates: Vec<StyleCandidate> = styles
            .iter()
            .map(|s| StyleCandidate {
                id: s.id,
                name: s.name.clone(),
            })
            .collect();

        // Classification is cheap to skip: on error the event is dropped
        // with no record, rather than failing anything user-visible.
        let detection = match self.detector.classify(&event.text, &candidates).await {
            Ok(detection) => detection,
            Err(e) => {
                tracing::warn!(error = %e, "Quote detection failed, dropping event");
                return Ok(IntakeOutcome::DetectionFailed);
            }
        };
        if !detection.is_quote {
            return Ok(IntakeOutcome::NotAQuote);
        }

        // When the text itself names nobody, attribute the quote to its
        // author. Best-effort: an unresolvable display leaves it blank.
        let attributed_to = match detection.attributed_to.clone() {
            Some(who) => Some(who),
            None => self
                .chat
                .resolve_user_display(&workspace.bot_token, &event.user_id)
                .await
                .map(|display| display.name)
                .map_err(|e| {
                    tracing::debug!(error = %e, "Could not resolve author display name");
                })
                .ok(),
        };

        let enabled_ids: Vec<DbId> = styles.iter().map(|s| s.id).collect();
        let mode = StyleMode::parse(&channel.style_mode).unwrap_or(StyleMode::Random);
        let style_id = select_style(&enabled_ids, mode, detection.style_hint);

        let input = CreateQuote {
            workspace_id: workspace.id,
            channel_id: channel.id,
            source_message_id: event.message_id.clone(),
            quote_text: detection.quote_text.clone(),
            attributed_to,
            confidence: detection.confidence,
        };
        let (quote, generation) =
            match QuoteRepo::create_with_first_generation(&self.pool, &input, style_id, None).await
            {
                Ok(pair) => pair,
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!(
                        source_message_id = %event.message_id,
                        "Duplicate source message, already handled"
                    );
                    return Ok(IntakeOutcome::AlreadyHandled);
                }
                Err(e) => return Err(e.into()),
            };

        self.bus.publish(
            PipelineEvent::new(event_types::QUOTE_DETECTED)
                .with_source("quote", quote.id)
                .with_payload(serde_json::json!({
                    "workspace_id": workspace.id,
                    "confidence": detection.confidence,
                })),
        );

        self.react_best_effort(&workspace, event, PENDING_REACTION)
            .await;

        let view = GenerationView {
            id: generation.id,
            source_message_id: quote.source_message_id.clone(),
            quote_text: quote.quote_text.clone(),
            attributed_to: quote.attributed_to.clone(),
            style_id: generation.style_id,
            style_override: generation.style_override.clone(),
        };
        let job = self.build_job(&workspace, &channel, quote.id, &view);
        let job_id = match self.queue.enqueue(&job).await {
            Ok(id) => id,
            Err(e) => {
                // The pair must not sit PENDING forever with no delivery.
                let message = e.to_string();
                GenerationRepo::fail(&self.pool, generation.id, &message).await?;
                QuoteRepo::fail(&self.pool, quote.id).await?;
                return Err(e.into());
            }
        };

        self.bus.publish(
            PipelineEvent::new(event_types::GENERATION_ENQUEUED)
                .with_source("generation", generation.id)
                .with_payload(serde_json::json!({"job_id": job_id})),
        );

        Ok(IntakeOutcome::Enqueued {
            quote_id: quote.id,
            generation_id: generation.id,
            job_id,
        })
    }

    /// Find the channel, creating it on first contact when the tier's
    /// ceiling allows. Fail closed: at the ceiling, no new channel.
    async fn resolve_channel(
        &self,
        workspace: &Workspace,
        platform_channel_id: &str,
    ) -> Result<ChannelResolution, sqlx::Error> {
        if let Some(channel) = ChannelRepo::find(&self.pool, workspace.id, platform_channel_id).await?
        {
            if !channel.is_active || channel.is_paused {
                return Ok(ChannelResolution::Inactive);
            }
            return Ok(ChannelResolution::Ready(channel));
        }

        let tier = PlanTier::parse(&workspace.plan_tier).unwrap_or(PlanTier::Free);
        let count = ChannelRepo::count_for_workspace(&self.pool, workspace.id).await?;
        if count >= tier.channel_ceiling() {
            tracing::info!(
                workspace_id = workspace.id,
                ceiling = tier.channel_ceiling(),
                "Channel ceiling reached, not monitoring new channel"
            );
            return Ok(ChannelResolution::CeilingReached);
        }

        let channel = ChannelRepo::create(&self.pool, workspace.id, platform_channel_id).await?;
        tracing::info!(
            workspace_id = workspace.id,
            channel_id = channel.id,
            platform_channel_id,
            "Monitoring new channel"
        );
        Ok(ChannelResolution::Ready(channel))
    }

    /// Entitlement gate. On denial, tell the author ephemerally
    /// (best-effort) and report `false`.
    pub(crate) async fn check_entitlement(
        &self,
        workspace: &Workspace,
        event: &ChatEvent,
    ) -> Result<bool, sqlx::Error> {
        let period = period_start(Utc::now());
        let used = UsageRepo::quotes_used(&self.pool, workspace.id, period).await?;
        let decision = decide(used, workspace.monthly_quota, workspace.bonus_credits);
        if decision.allowed {
            return Ok(true);
        }

        tracing::info!(
            workspace_id = workspace.id,
            used = decision.used,
            quota = decision.quota,
            "Quota exhausted, declining"
        );
        if let Err(e) = self
            .chat
            .post_ephemeral(
                &workspace.bot_token,
                &event.channel_id,
                &event.user_id,
                QUOTA_EXHAUSTED_NOTICE,
            )
            .await
        {
            self.note_chat_failure(workspace, "quota notice", e).await;
        }
        Ok(false)
    }

    /// Assemble the worker payload. The payload is self-sufficient; the
    /// worker never re-derives these from the store.
    pub(crate) fn build_job(
        &self,
        workspace: &Workspace,
        channel: &Channel,
        quote_id: DbId,
        generation: &GenerationView,
    ) -> GenerationJob {
        let tier = PlanTier::parse(&workspace.plan_tier).unwrap_or(PlanTier::Free);
        GenerationJob {
            workspace_id: workspace.id,
            channel_id: channel.id,
            quote_id,
            generation_id: generation.id,
            platform_channel_id: channel.channel_id.clone(),
            reply_channel_id: channel.reply_channel_id.clone(),
            source_message_id: generation.source_message_id.clone(),
            quote_text: generation.quote_text.clone(),
            attributed_to: generation.attributed_to.clone(),
            style_id: generation.style_id,
            style_override: generation.style_override.clone(),
            plan_tier: workspace.plan_tier.clone(),
            output_size: channel.output_size,
            quality: quality_for(tier).to_string(),
        }
    }

    /// Add a reaction, swallowing chat failures.
    pub(crate) async fn react_best_effort(
        &self,
        workspace: &Workspace,
        event: &ChatEvent,
        name: &str,
    ) {
        if let Err(e) = self
            .chat
            .add_reaction(
                &workspace.bot_token,
                &event.channel_id,
                &event.message_id,
                name,
            )
            .await
        {
            self.note_chat_failure(workspace, "reaction", e).await;
        }
    }

    /// Log a best-effort chat failure; a revoked credential additionally
    /// flags the workspace for reconnection.
    pub(crate) async fn note_chat_failure(
        &self,
        workspace: &Workspace,
        what: &str,
        error: ChatError,
    ) {
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
        tracing::warn!(
            workspace_id = workspace.id,
            error = %error,
            what,
            "Best-effort chat call failed"
        );
    }
}

enum ChannelResolution {
    Ready(Channel),
    Inactive,
    CeilingReached,
}

/// The per-attempt fields `build_job` needs, independent of whether they
/// come from a fresh quote/generation pair or a regrant attempt.
pub(crate) struct GenerationView {
    pub id: DbId,
    pub source_message_id: String,
    pub quote_text: String,
    pub attributed_to: Option<String>,
    pub style_id: Option<DbId>,
    pub style_override: Option<String>,
}

/// Model quality by tier: paid tiers get the high-fidelity renders.
pub(crate) fn quality_for(tier: PlanTier) -> &'static str {
    match tier {
        PlanTier::Free => "standard",
        PlanTier::Pro | PlanTier::Team => "hd",
    }
}
