//! Generation (attempt) entity model.

use serde::Serialize;
use sqlx::FromRow;

use quoteframe_core::types::{DbId, Timestamp};

/// A row from the `generations` table: one image-production attempt for a
/// quote. `attempt_number` is monotonic per quote, the count of prior
/// attempts plus one, never reused.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Generation {
    pub id: DbId,
    pub quote_id: DbId,
    pub style_id: Option<DbId>,
    /// Free-text style description from the picker, overriding the template.
    pub style_override: Option<String>,
    pub attempt_number: i32,
    pub status: String,
    pub image_url: Option<String>,
    pub prompt: Option<String>,
    pub processing_error: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
