//! Repository for the `workspaces` table.

use sqlx::PgPool;

use quoteframe_core::types::DbId;

use crate::models::workspace::{InstallWorkspace, Workspace};

/// Column list for `workspaces` queries.
const COLUMNS: &str = "id, team_id, bot_token, bot_user_id, plan_tier, \
    monthly_quota, bonus_credits, is_active, needs_reconnection, \
    created_at, updated_at";

/// Provides CRUD operations for workspaces.
pub struct WorkspaceRepo;

impl WorkspaceRepo {
    /// Install a workspace, or reactivate and refresh credentials on
    /// re-install of a previously deactivated one.
    pub async fn install(pool: &PgPool, input: &InstallWorkspace) -> Result<Workspace, sqlx::Error> {
        let query = format!(
            "INSERT INTO workspaces (team_id, bot_token, bot_user_id, plan_tier, monthly_quota) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (team_id) DO UPDATE \
             SET bot_token = EXCLUDED.bot_token, \
                 bot_user_id = EXCLUDED.bot_user_id, \
                 is_active = TRUE, \
                 needs_reconnection = FALSE, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workspace>(&query)
            .bind(&input.team_id)
            .bind(&input.bot_token)
            .bind(&input.bot_user_id)
            .bind(&input.plan_tier)
            .bind(input.monthly_quota)
            .fetch_one(pool)
            .await
    }

    /// Find a workspace by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Workspace>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workspaces WHERE id = $1");
        sqlx::query_as::<_, Workspace>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look up a workspace by its platform team id.
    pub async fn find_by_team_id(
        pool: &PgPool,
        team_id: &str,
    ) -> Result<Option<Workspace>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workspaces WHERE team_id = $1");
        sqlx::query_as::<_, Workspace>(&query)
            .bind(team_id)
            .fetch_optional(pool)
            .await
    }

    /// Deactivate a workspace on uninstall. Rows are never deleted.
    pub async fn deactivate(pool: &PgPool, team_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workspaces SET is_active = FALSE, updated_at = NOW() WHERE team_id = $1",
        )
        .bind(team_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flag or clear the connection-health bit (e.g. after a token revoke).
    pub async fn set_needs_reconnection(
        pool: &PgPool,
        workspace_id: DbId,
        needs_reconnection: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workspaces SET needs_reconnection = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(workspace_id)
        .bind(needs_reconnection)
        .execute(pool)
        .await?;
        Ok(())
    }
}
