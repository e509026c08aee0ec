//! Mention-driven regrant: additional attempts for an existing quote.
//!
//! Triggered by a thread reply that mentions the bot. A plain mention
//! auto-selects an unused style and queues a fresh attempt; a mention
//! carrying the retry keyword opens the interactive style picker instead,
//! and the picker callback lands in [`complete_picker_selection`].
//!
//! [`complete_picker_selection`]: PipelineIntake::complete_picker_selection

use std::collections::HashSet;

use quoteframe_chat::api::{ChatApi, PickerStyle};
use quoteframe_core::event::ChatEvent;
use quoteframe_core::style::{select_regrant_style, select_style, StyleMode};
use quoteframe_core::types::DbId;
use quoteframe_db::models::channel::Channel;
use quoteframe_db::models::generation::Generation;
use quoteframe_db::models::quote::{CreateQuote, Quote};
use quoteframe_db::models::workspace::Workspace;
use quoteframe_db::repositories::channel_repo::ChannelRepo;
use quoteframe_db::repositories::generation_repo::GenerationRepo;
use quoteframe_db::repositories::quote_repo::QuoteRepo;
use quoteframe_db::repositories::workspace_repo::WorkspaceRepo;
use quoteframe_db::is_unique_violation;
use quoteframe_events::bus::event_types;
use quoteframe_events::PipelineEvent;

use crate::detector::{QuoteDetector, StyleCandidate};
use crate::intake::{GenerationView, IntakeError, PipelineIntake, PENDING_REACTION};
use crate::queue::JobQueue;

/// Mention text that opens the picker instead of auto-generating.
const PICKER_KEYWORD: &str = "retry";

/// What the regrant path did with a mention.
#[derive(Debug)]
pub enum MentionOutcome {
    /// Monthly allowance used up; the author was notified ephemerally.
    QuotaExhausted,
    /// The interactive style picker was posted.
    PickerShown,
    /// The channel has no enabled styles to select from.
    NoStylesEnabled,
    /// The thread root could not be read or the picker could not be
    /// posted; nothing was recorded.
    ChatUnavailable,
    /// A new attempt was created and queued.
    Regranted {
        quote_id: DbId,
        generation_id: DbId,
        job_id: DbId,
    },
}

impl<D, Q, C> PipelineIntake<D, Q, C>
where
    D: QuoteDetector,
    Q: JobQueue,
    C: ChatApi,
{
    /// Handle a bot mention inside an existing thread.
    pub(crate) async fn handle_mention(
        &self,
        event: &ChatEvent,
        workspace: &Workspace,
        channel: &Channel,
    ) -> Result<MentionOutcome, IntakeError> {
        // is_thread_reply() guarantees the root id is present.
        let Some(root_id) = event.thread_root_id.as_deref() else {
            return Ok(MentionOutcome::ChatUnavailable);
        };

        if !self.check_entitlement(workspace, event).await? {
            return Ok(MentionOutcome::QuotaExhausted);
        }

        let styles = ChannelRepo::enabled_styles(&self.pool, channel.id).await?;
        if styles.is_empty() {
            tracing::warn!(
                channel_id = channel.id,
                "Mention in a channel with no enabled styles"
            );
            return Ok(MentionOutcome::NoStylesEnabled);
        }
        let enabled_ids: Vec<DbId> = styles.iter().map(|s| s.id).collect();

        let existing = QuoteRepo::find_by_source(&self.pool, workspace.id, root_id).await?;

        let Some(quote) = existing else {
            // First contact with this thread: materialize the root message
            // as a quote, then proceed like a fresh intake.
            return self
                .regrant_from_root(event, workspace, channel, root_id, &enabled_ids)
                .await;
        };

        if event.text.to_lowercase().contains(PICKER_KEYWORD) {
            let used: HashSet<DbId> = GenerationRepo::used_style_ids(&self.pool, quote.id)
                .await?
                .into_iter()
                .collect();
            let picker: Vec<PickerStyle> = styles
                .iter()
                .map(|s| PickerStyle {
                    style_id: s.id,
                    name: s.name.clone(),
                    already_used: used.contains(&s.id),
                })
                .collect();
            if let Err(e) = self
                .chat
                .post_style_picker(
                    &workspace.bot_token,
                    &event.channel_id,
                    root_id,
                    &event.user_id,
                    &picker,
                )
                .await
            {
                self.note_chat_failure(workspace, "style picker", e).await;
                return Ok(MentionOutcome::ChatUnavailable);
            }
            return Ok(MentionOutcome::PickerShown);
        }

        let used: HashSet<DbId> = GenerationRepo::used_style_ids(&self.pool, quote.id)
            .await?
            .into_iter()
            .collect();
        let style_id = select_regrant_style(&enabled_ids, &used);
        self.create_and_enqueue_attempt(event, workspace, channel, &quote, style_id, None)
            .await
    }

    /// The picker callback: create exactly one new attempt with the
    /// user's chosen style.
    pub async fn complete_picker_selection(
        &self,
        team_id: &str,
        platform_channel_id: &str,
        root_message_id: &str,
        user_id: &str,
        style_id: DbId,
    ) -> Result<MentionOutcome, IntakeError> {
        let Some(workspace) = WorkspaceRepo::find_by_team_id(&self.pool, team_id).await? else {
            return Ok(MentionOutcome::ChatUnavailable);
        };
        let Some(channel) =
            ChannelRepo::find(&self.pool, workspace.id, platform_channel_id).await?
        else {
            return Ok(MentionOutcome::ChatUnavailable);
        };
        let Some(quote) =
            QuoteRepo::find_by_source(&self.pool, workspace.id, root_message_id).await?
        else {
            return Ok(MentionOutcome::ChatUnavailable);
        };

        let event = ChatEvent {
            team_id: team_id.to_string(),
            channel_id: platform_channel_id.to_string(),
            message_id: root_message_id.to_string(),
            user_id: user_id.to_string(),
            text: String::new(),
            thread_root_id: Some(root_message_id.to_string()),
            subtype: None,
        };
        if !self.check_entitlement(&workspace, &event).await? {
            return Ok(MentionOutcome::QuotaExhausted);
        }

        // Only styles enabled for the channel are offered; re-verify in
        // case the set changed since the picker was posted.
        let styles = ChannelRepo::enabled_styles(&self.pool, channel.id).await?;
        if !styles.iter().any(|s| s.id == style_id) {
            return Ok(MentionOutcome::NoStylesEnabled);
        }

        self.create_and_enqueue_attempt(&event, &workspace, &channel, &quote, Some(style_id), None)
            .await
    }

    /// Mention on a thread whose root was never processed: read the root
    /// message and create the quote pair directly. The user's mention is
    /// an explicit grant, so a failed or negative classification does not
    /// block it; detection only cleans up the text and attribution.
    async fn regrant_from_root(
        &self,
        event: &ChatEvent,
        workspace: &Workspace,
        channel: &Channel,
        root_id: &str,
        enabled_ids: &[DbId],
    ) -> Result<MentionOutcome, IntakeError> {
        let root_text = match self
            .chat
            .read_message(&workspace.bot_token, &event.channel_id, root_id)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                self.note_chat_failure(workspace, "root message read", e).await;
                return Ok(MentionOutcome::ChatUnavailable);
            }
        };

        let candidates: Vec<StyleCandidate> = Vec::new();
        let (quote_text, attributed_to, confidence) =
            match self.detector.classify(&root_text, &candidates).await {
                Ok(d) => (d.quote_text, d.attributed_to, d.confidence),
                Err(e) => {
                    tracing::warn!(error = %e, "Detection failed on regrant root, using raw text");
                    (root_text.clone(), None, 1.0)
                }
            };

        let mode = StyleMode::parse(&channel.style_mode).unwrap_or(StyleMode::Random);
        let style_id = select_style(enabled_ids, mode, None);

        let input = CreateQuote {
            workspace_id: workspace.id,
            channel_id: channel.id,
            source_message_id: root_id.to_string(),
            quote_text,
            attributed_to,
            confidence,
        };
        let (quote, generation) =
            match QuoteRepo::create_with_first_generation(&self.pool, &input, style_id, None).await
            {
                Ok(pair) => pair,
                Err(e) if is_unique_violation(&e) => {
                    // Lost a race with a concurrent mention; the winner's
                    // attempt covers this request.
                    return Ok(MentionOutcome::ChatUnavailable);
                }
                Err(e) => return Err(e.into()),
            };

        self.bus.publish(
            PipelineEvent::new(event_types::QUOTE_DETECTED)
                .with_source("quote", quote.id)
                .with_payload(serde_json::json!({
                    "workspace_id": workspace.id,
                    "via": "mention",
                })),
        );

        self.finish_enqueue(event, workspace, channel, &quote, &generation)
            .await
    }

    /// Create a follow-up attempt against an existing quote and queue it.
    async fn create_and_enqueue_attempt(
        &self,
        event: &ChatEvent,
        workspace: &Workspace,
        channel: &Channel,
        quote: &Quote,
        style_id: Option<DbId>,
        style_override: Option<&str>,
    ) -> Result<MentionOutcome, IntakeError> {
        let generation =
            GenerationRepo::create_attempt(&self.pool, quote.id, style_id, style_override).await?;

        self.finish_enqueue(event, workspace, channel, quote, &generation)
            .await
    }

    /// Shared tail of both regrant paths: react, enqueue, publish.
    async fn finish_enqueue(
        &self,
        event: &ChatEvent,
        workspace: &Workspace,
        channel: &Channel,
        quote: &Quote,
        generation: &Generation,
    ) -> Result<MentionOutcome, IntakeError> {
        self.react_best_effort(workspace, event, PENDING_REACTION)
            .await;

        let view = GenerationView {
            id: generation.id,
            source_message_id: quote.source_message_id.clone(),
            quote_text: quote.quote_text.clone(),
            attributed_to: quote.attributed_to.clone(),
            style_id: generation.style_id,
            style_override: generation.style_override.clone(),
        };
        let job = self.build_job(workspace, channel, quote.id, &view);
        let job_id = match self.queue.enqueue(&job).await {
            Ok(id) => id,
            Err(e) => {
                let message = e.to_string();
                GenerationRepo::fail(&self.pool, generation.id, &message).await?;
                if generation.attempt_number == 1 {
                    QuoteRepo::fail(&self.pool, quote.id).await?;
                }
                return Err(e.into());
            }
        };

        self.bus.publish(
            PipelineEvent::new(event_types::GENERATION_ENQUEUED)
                .with_source("generation", generation.id)
                .with_payload(serde_json::json!({"job_id": job_id, "via": "mention"})),
        );

        Ok(MentionOutcome::Regranted {
            quote_id: quote.id,
            generation_id: generation.id,
            job_id,
        })
    }
}
