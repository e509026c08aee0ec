//! Workspace (tenant) entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use quoteframe_core::types::{DbId, Timestamp};

/// A row from the `workspaces` table. The tenant isolation boundary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workspace {
    pub id: DbId,
    /// Platform team identifier (unique).
    pub team_id: String,
    /// Bot credential for this workspace's chat API calls.
    #[serde(skip_serializing)]
    pub bot_token: String,
    /// The bot's own platform user id, used by the self-message filter.
    pub bot_user_id: String,
    pub plan_tier: String,
    pub monthly_quota: i32,
    pub bonus_credits: i32,
    pub is_active: bool,
    pub needs_reconnection: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for installing (or re-installing) a workspace.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallWorkspace {
    pub team_id: String,
    pub bot_token: String,
    pub bot_user_id: String,
    pub plan_tier: String,
    pub monthly_quota: i32,
}
