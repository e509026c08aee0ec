//! Quote entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use quoteframe_core::types::{DbId, Timestamp};

/// A row from the `quotes` table: one detected/accepted unit of source
/// text. Keyed uniquely by `(workspace_id, source_message_id)`, which is
/// the idempotency anchor for event redelivery.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quote {
    pub id: DbId,
    pub workspace_id: DbId,
    pub channel_id: DbId,
    pub source_message_id: String,
    pub quote_text: String,
    pub attributed_to: Option<String>,
    pub confidence: f64,
    pub status: String,
    /// Denormalized for fast display; written only by the worker.
    pub latest_image_url: Option<String>,
    pub latest_style_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a quote (always paired with its first generation).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuote {
    pub workspace_id: DbId,
    pub channel_id: DbId,
    pub source_message_id: String,
    pub quote_text: String,
    pub attributed_to: Option<String>,
    pub confidence: f64,
}
