//! Repository for the `generations` table.

use sqlx::PgPool;

use quoteframe_core::status::GenerationStatus;
use quoteframe_core::types::DbId;

use crate::models::generation::Generation;

/// Column list for `generations` queries. Shared with `QuoteRepo` for the
/// paired insert.
pub(crate) const GENERATION_COLUMNS: &str = "id, quote_id, style_id, style_override, \
    attempt_number, status, image_url, prompt, processing_error, \
    started_at, completed_at, created_at, updated_at";

/// Provides CRUD operations for generation attempts.
pub struct GenerationRepo;

impl GenerationRepo {
    /// Create a follow-up attempt for an existing quote.
    ///
    /// `attempt_number` is computed as `MAX(attempt_number) + 1` in the
    /// same statement; `uq_generations_quote_attempt` rejects the loser
    /// of a concurrent race rather than allowing a reused number.
    pub async fn create_attempt(
        pool: &PgPool,
        quote_id: DbId,
        style_id: Option<DbId>,
        style_override: Option<&str>,
    ) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "INSERT INTO generations (quote_id, style_id, style_override, attempt_number) \
             SELECT $1, $2, $3, COALESCE(MAX(attempt_number), 0) + 1 \
             FROM generations WHERE quote_id = $1 \
             RETURNING {GENERATION_COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(quote_id)
            .bind(style_id)
            .bind(style_override)
            .fetch_one(pool)
            .await
    }

    /// Find a generation by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!("SELECT {GENERATION_COLUMNS} FROM generations WHERE id = $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All generations for a quote, oldest attempt first.
    pub async fn list_for_quote(
        pool: &PgPool,
        quote_id: DbId,
    ) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {GENERATION_COLUMNS} FROM generations \
             WHERE quote_id = $1 ORDER BY attempt_number"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(quote_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct style ids used by prior attempts, for anti-repeat selection.
    pub async fn used_style_ids(pool: &PgPool, quote_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT DISTINCT style_id FROM generations \
             WHERE quote_id = $1 AND style_id IS NOT NULL",
        )
        .bind(quote_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Transition to PROCESSING, stamping `started_at`.
    pub async fn mark_processing(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generations \
             SET status = $2, started_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(GenerationStatus::Processing.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Terminal success: store the artifact URL and the prompt used.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        image_url: &str,
        prompt: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generations \
             SET status = $2, image_url = $3, prompt = $4, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(GenerationStatus::Completed.as_str())
        .bind(image_url)
        .bind(prompt)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Terminal failure: capture the causing error verbatim.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generations \
             SET status = $2, processing_error = $3, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(GenerationStatus::Failed.as_str())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }
}
