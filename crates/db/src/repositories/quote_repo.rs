//! Repository for the `quotes` table.
//!
//! Quote creation is always paired with the first generation attempt in
//! one transaction (both-or-neither). The unique constraint
//! `uq_quotes_workspace_source` is the idempotency anchor: a second
//! creation attempt for the same source message fails with a unique
//! violation and must be treated as "already handled".

use sqlx::PgPool;

use quoteframe_core::status::GenerationStatus;
use quoteframe_core::types::DbId;

use crate::models::generation::Generation;
use crate::models::quote::{CreateQuote, Quote};
use crate::repositories::generation_repo::GENERATION_COLUMNS;

/// Column list for `quotes` queries.
const COLUMNS: &str = "id, workspace_id, channel_id, source_message_id, \
    quote_text, attributed_to, confidence, status, latest_image_url, \
    latest_style_id, created_at, updated_at";

/// Provides CRUD operations for quotes.
pub struct QuoteRepo;

impl QuoteRepo {
    /// Create a quote and its first generation attempt transactionally.
    ///
    /// `style_id`/`style_override` seed the attempt; both records start
    /// PENDING. Bubbles up the unique violation on duplicate source
    /// messages; callers check `is_unique_violation`.
    pub async fn create_with_first_generation(
        pool: &PgPool,
        input: &CreateQuote,
        style_id: Option<DbId>,
        style_override: Option<&str>,
    ) -> Result<(Quote, Generation), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let quote_query = format!(
            "INSERT INTO quotes \
                (workspace_id, channel_id, source_message_id, quote_text, \
                 attributed_to, confidence) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let quote = sqlx::query_as::<_, Quote>(&quote_query)
            .bind(input.workspace_id)
            .bind(input.channel_id)
            .bind(&input.source_message_id)
            .bind(&input.quote_text)
            .bind(&input.attributed_to)
            .bind(input.confidence)
            .fetch_one(&mut *tx)
            .await?;

        let generation_query = format!(
            "INSERT INTO generations (quote_id, style_id, style_override, attempt_number) \
             VALUES ($1, $2, $3, 1) \
             RETURNING {GENERATION_COLUMNS}"
        );
        let generation = sqlx::query_as::<_, Generation>(&generation_query)
            .bind(quote.id)
            .bind(style_id)
            .bind(style_override)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((quote, generation))
    }

    /// Find a quote by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Quote>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quotes WHERE id = $1");
        sqlx::query_as::<_, Quote>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look up a quote by its idempotency key.
    pub async fn find_by_source(
        pool: &PgPool,
        workspace_id: DbId,
        source_message_id: &str,
    ) -> Result<Option<Quote>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quotes \
             WHERE workspace_id = $1 AND source_message_id = $2"
        );
        sqlx::query_as::<_, Quote>(&query)
            .bind(workspace_id)
            .bind(source_message_id)
            .fetch_optional(pool)
            .await
    }

    /// Transition the quote to PROCESSING.
    pub async fn mark_processing(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE quotes SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(GenerationStatus::Processing.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Complete the quote, refreshing the denormalized latest artifact.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        image_url: &str,
        style_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE quotes \
             SET status = $2, latest_image_url = $3, latest_style_id = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(GenerationStatus::Completed.as_str())
        .bind(image_url)
        .bind(style_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark the quote FAILED.
    pub async fn fail(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE quotes SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(GenerationStatus::Failed.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }
}
