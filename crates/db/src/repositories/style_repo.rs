//! Repository for the `styles` table.

use sqlx::PgPool;

use quoteframe_core::types::DbId;

use crate::models::style::Style;

/// Column list for `styles` queries.
const COLUMNS: &str =
    "id, workspace_id, name, prompt_template, enabled_by_default, created_at, updated_at";

/// Provides read operations for prompt styles.
pub struct StyleRepo;

impl StyleRepo {
    /// Find a style by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Style>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM styles WHERE id = $1");
        sqlx::query_as::<_, Style>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All styles visible to a workspace: global built-ins plus its own.
    pub async fn list_for_workspace(
        pool: &PgPool,
        workspace_id: DbId,
    ) -> Result<Vec<Style>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM styles \
             WHERE workspace_id IS NULL OR workspace_id = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, Style>(&query)
            .bind(workspace_id)
            .fetch_all(pool)
            .await
    }
}
