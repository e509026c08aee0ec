//! Repository for the `events` table.

use sqlx::PgPool;

use quoteframe_core::types::DbId;

use crate::models::event::EventRow;

/// Column list for `events` queries.
const COLUMNS: &str = "id, event_type, source_entity_type, source_entity_id, payload, created_at";

/// Provides append/read operations for persisted pipeline events.
pub struct EventRepo;

impl EventRepo {
    /// Append one event row.
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<EventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO events (event_type, source_entity_type, source_entity_id, payload) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(event_type)
            .bind(source_entity_type)
            .bind(source_entity_id)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Most recent events, newest first.
    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<EventRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events ORDER BY id DESC LIMIT $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
