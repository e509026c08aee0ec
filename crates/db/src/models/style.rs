//! Style entity model.

use serde::Serialize;
use sqlx::FromRow;

use quoteframe_core::types::{DbId, Timestamp};

/// A row from the `styles` table: a named prompt template.
///
/// `workspace_id` is `NULL` for the built-in global styles and set for
/// workspace-scoped custom styles.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Style {
    pub id: DbId,
    pub workspace_id: Option<DbId>,
    pub name: String,
    pub prompt_template: String,
    /// Consulted when a channel is auto-created.
    pub enabled_by_default: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
