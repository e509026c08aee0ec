//! Usage record entity model.

use serde::Serialize;
use sqlx::FromRow;

use quoteframe_core::types::{DbId, Timestamp};

/// A row from the `usage_records` table: consumed quota units for one
/// workspace and billing period. Upsert-with-increment semantics; never
/// decremented except by period rollover (a new `period_start` row).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UsageRecord {
    pub id: DbId,
    pub workspace_id: DbId,
    pub period_start: Timestamp,
    pub quotes_used: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
