//! Channel entity model.

use serde::Serialize;
use sqlx::FromRow;

use quoteframe_core::types::{DbId, Timestamp};

/// A row from the `channels` table: one monitored conversation.
///
/// Created lazily on the first qualifying event in a channel, subject to
/// the workspace tier's channel ceiling.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Channel {
    pub id: DbId,
    pub workspace_id: DbId,
    /// Platform channel identifier.
    pub channel_id: String,
    pub is_active: bool,
    pub is_paused: bool,
    /// `random` or `ai_assisted`; parsed via `StyleMode::parse`.
    pub style_mode: String,
    /// Optional alternate destination for artifact replies.
    pub reply_channel_id: Option<String>,
    /// Output edge length in pixels (artifacts are square).
    pub output_size: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
