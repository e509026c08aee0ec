//! Repository for the `channels` table and the channel/style join.

use sqlx::PgPool;

use quoteframe_core::types::DbId;

use crate::models::channel::Channel;
use crate::models::style::Style;

/// Column list for `channels` queries.
const COLUMNS: &str = "id, workspace_id, channel_id, is_active, is_paused, \
    style_mode, reply_channel_id, output_size, created_at, updated_at";

/// Column list for joined `styles` queries (table-qualified).
const STYLE_COLUMNS: &str = "s.id, s.workspace_id, s.name, s.prompt_template, \
    s.enabled_by_default, s.created_at, s.updated_at";

/// Provides CRUD operations for monitored channels.
pub struct ChannelRepo;

impl ChannelRepo {
    /// Look up a channel by its platform id within a workspace.
    pub async fn find(
        pool: &PgPool,
        workspace_id: DbId,
        platform_channel_id: &str,
    ) -> Result<Option<Channel>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM channels WHERE workspace_id = $1 AND channel_id = $2");
        sqlx::query_as::<_, Channel>(&query)
            .bind(workspace_id)
            .bind(platform_channel_id)
            .fetch_optional(pool)
            .await
    }

    /// Number of channels a workspace currently monitors, for the tier
    /// ceiling check.
    pub async fn count_for_workspace(
        pool: &PgPool,
        workspace_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM channels WHERE workspace_id = $1")
            .bind(workspace_id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Lazily create a channel on first qualifying event.
    ///
    /// Seeds the channel's enabled-style set from the default-enabled
    /// styles visible to the workspace (global built-ins plus its own),
    /// in the same transaction as the channel row.
    pub async fn create(
        pool: &PgPool,
        workspace_id: DbId,
        platform_channel_id: &str,
    ) -> Result<Channel, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO channels (workspace_id, channel_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let channel = sqlx::query_as::<_, Channel>(&query)
            .bind(workspace_id)
            .bind(platform_channel_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO channel_styles (channel_id, style_id) \
             SELECT $1, id FROM styles \
             WHERE enabled_by_default \
               AND (workspace_id IS NULL OR workspace_id = $2)",
        )
        .bind(channel.id)
        .bind(workspace_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(channel)
    }

    /// The channel's enabled styles, for selection and the picker.
    pub async fn enabled_styles(
        pool: &PgPool,
        channel_id: DbId,
    ) -> Result<Vec<Style>, sqlx::Error> {
        let query = format!(
            "SELECT {STYLE_COLUMNS} FROM styles s \
             JOIN channel_styles cs ON cs.style_id = s.id \
             WHERE cs.channel_id = $1 \
             ORDER BY s.id"
        );
        sqlx::query_as::<_, Style>(&query)
            .bind(channel_id)
            .fetch_all(pool)
            .await
    }

    /// Pause or resume monitoring for a channel.
    pub async fn set_paused(
        pool: &PgPool,
        channel_id: DbId,
        paused: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE channels SET is_paused = $2, updated_at = NOW() WHERE id = $1")
            .bind(channel_id)
            .bind(paused)
            .execute(pool)
            .await?;
        Ok(())
    }
}
