//! The outbound chat API surface consumed by the pipeline.
//!
//! [`ChatApi`] is the seam the intake and worker are written against;
//! tests substitute in-memory fakes. Every method takes the workspace's
//! bot token explicitly. Clients are never cached per credential, so a
//! horizontally scaled worker holds no per-tenant connection state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quoteframe_core::types::DbId;

/// Receipt for a posted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub channel_id: String,
    pub message_id: String,
}

/// Display info for a platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDisplay {
    pub name: String,
    pub avatar_url: Option<String>,
}

/// One entry in the interactive style picker.
#[derive(Debug, Clone, Serialize)]
pub struct PickerStyle {
    pub style_id: DbId,
    pub name: String,
    /// Marked in the picker so users can see which looks already exist.
    pub already_used: bool,
}

/// Errors from the chat transport.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The underlying HTTP request failed (network, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform answered with `ok: false`.
    #[error("Chat API error: {0}")]
    Api(String),

    /// The platform revoked or rejected the workspace credential.
    #[error("Chat credential rejected: {0}")]
    AuthRevoked(String),
}

/// Operations the pipeline needs from the chat platform.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post a reply into the thread rooted at `root_id`, optionally with
    /// an image attachment rendered from its public URL.
    async fn post_thread_reply(
        &self,
        token: &str,
        channel_id: &str,
        root_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<MessageReceipt, ChatError>;

    /// Post an ephemeral notice visible only to `user_id`.
    async fn post_ephemeral(
        &self,
        token: &str,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ChatError>;

    /// Add a reaction emoji to a message.
    async fn add_reaction(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
        name: &str,
    ) -> Result<(), ChatError>;

    /// Remove a reaction emoji from a message.
    async fn remove_reaction(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
        name: &str,
    ) -> Result<(), ChatError>;

    /// Read the text of a single message.
    async fn read_message(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<String, ChatError>;

    /// Resolve a user's display name and avatar.
    async fn resolve_user_display(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<UserDisplay, ChatError>;

    /// Post the interactive style picker into a thread.
    async fn post_style_picker(
        &self,
        token: &str,
        channel_id: &str,
        root_id: &str,
        user_id: &str,
        styles: &[PickerStyle],
    ) -> Result<(), ChatError>;
}
