//! Repository for the `usage_records` table.
//!
//! One row per `(workspace_id, period_start)`. The increment is a single
//! atomic upsert, safe under concurrent commits for the same workspace.

use sqlx::PgPool;

use quoteframe_core::types::{DbId, Timestamp};

use crate::models::usage::UsageRecord;

/// Column list for `usage_records` queries.
const COLUMNS: &str = "id, workspace_id, period_start, quotes_used, created_at, updated_at";

/// Provides quota-consumption bookkeeping.
pub struct UsageRepo;

impl UsageRepo {
    /// Units consumed in the given period. Absent row means zero.
    pub async fn quotes_used(
        pool: &PgPool,
        workspace_id: DbId,
        period_start: Timestamp,
    ) -> Result<i32, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT quotes_used FROM usage_records \
             WHERE workspace_id = $1 AND period_start = $2",
        )
        .bind(workspace_id)
        .bind(period_start)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|r| r.0).unwrap_or(0))
    }

    /// Atomically record one consumed unit (increment-or-insert).
    pub async fn increment(
        pool: &PgPool,
        workspace_id: DbId,
        period_start: Timestamp,
    ) -> Result<UsageRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO usage_records (workspace_id, period_start, quotes_used) \
             VALUES ($1, $2, 1) \
             ON CONFLICT (workspace_id, period_start) DO UPDATE \
             SET quotes_used = usage_records.quotes_used + 1, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UsageRecord>(&query)
            .bind(workspace_id)
            .bind(period_start)
            .fetch_one(pool)
            .await
    }
}
