//! HTTP implementation of [`ChatApi`] against the platform's Web API.
//!
//! One shared `reqwest::Client` (connection pool, no credentials); the
//! workspace bot token travels with each call as a bearer header.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::api::{ChatApi, ChatError, MessageReceipt, PickerStyle, UserDisplay};

/// Default Web API root.
const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Platform error codes that mean the credential itself is dead and the
/// workspace should be flagged for reconnection.
const AUTH_ERROR_CODES: &[&str] = &["token_revoked", "invalid_auth", "account_inactive"];

/// Generic Web API response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
    channel: Option<String>,
    #[serde(default)]
    messages: Vec<ApiMessage>,
    user: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    profile: ApiProfile,
}

#[derive(Debug, Deserialize)]
struct ApiProfile {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    real_name: String,
    image_192: Option<String>,
}

/// Web API client.
pub struct HttpChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatClient {
    /// Create a client against the default API root.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom API root (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// POST a JSON body to a Web API method and check the `ok` flag.
    async fn call(
        &self,
        token: &str,
        method: &str,
        body: serde_json::Value,
    ) -> Result<ApiEnvelope, ChatError> {
        let url = format!("{}/{method}", self.base_url);
        let envelope: ApiEnvelope = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".into());
            if AUTH_ERROR_CODES.contains(&code.as_str()) {
                return Err(ChatError::AuthRevoked(code));
            }
            return Err(ChatError::Api(code));
        }
        Ok(envelope)
    }
}

impl Default for HttpChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatApi for HttpChatClient {
    async fn post_thread_reply(
        &self,
        token: &str,
        channel_id: &str,
        root_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<MessageReceipt, ChatError> {
        let mut body = json!({
            "channel": channel_id,
            "thread_ts": root_id,
            "text": text,
        });
        if let Some(url) = image_url {
            body["blocks"] = json!([
                { "type": "section", "text": { "type": "mrkdwn", "text": text } },
                { "type": "image", "image_url": url, "alt_text": "generated quote artwork" },
            ]);
        }

        let envelope = self.call(token, "chat.postMessage", body).await?;
        Ok(MessageReceipt {
            channel_id: envelope.channel.unwrap_or_else(|| channel_id.into()),
            message_id: envelope.ts.unwrap_or_default(),
        })
    }

    async fn post_ephemeral(
        &self,
        token: &str,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        self.call(
            token,
            "chat.postEphemeral",
            json!({ "channel": channel_id, "user": user_id, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        self.call(
            token,
            "reactions.add",
            json!({ "channel": channel_id, "timestamp": message_id, "name": name }),
        )
        .await?;
        Ok(())
    }

    async fn remove_reaction(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
        name: &str,
    ) -> Result<(), ChatError> {
        self.call(
            token,
            "reactions.remove",
            json!({ "channel": channel_id, "timestamp": message_id, "name": name }),
        )
        .await?;
        Ok(())
    }

    async fn read_message(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<String, ChatError> {
        let envelope = self
            .call(
                token,
                "conversations.history",
                json!({
                    "channel": channel_id,
                    "latest": message_id,
                    "inclusive": true,
                    "limit": 1,
                }),
            )
            .await?;
        Ok(envelope
            .messages
            .into_iter()
            .next()
            .map(|m| m.text)
            .unwrap_or_default())
    }

    async fn resolve_user_display(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<UserDisplay, ChatError> {
        let envelope = self
            .call(token, "users.info", json!({ "user": user_id }))
            .await?;
        let profile = envelope
            .user
            .map(|u| u.profile)
            .ok_or_else(|| ChatError::Api("missing user in users.info response".into()))?;
        let name = if profile.display_name.is_empty() {
            profile.real_name
        } else {
            profile.display_name
        };
        Ok(UserDisplay {
            name,
            avatar_url: profile.image_192,
        })
    }

    async fn post_style_picker(
        &self,
        token: &str,
        channel_id: &str,
        root_id: &str,
        user_id: &str,
        styles: &[PickerStyle],
    ) -> Result<(), ChatError> {
        let buttons: Vec<serde_json::Value> = styles
            .iter()
            .map(|s| {
                let label = if s.already_used {
                    format!("{} (used)", s.name)
                } else {
                    s.name.clone()
                };
                json!({
                    "type": "button",
                    "text": { "type": "plain_text", "text": label },
                    "action_id": format!("pick_style_{}", s.style_id),
                    "value": s.style_id.to_string(),
                })
            })
            .collect();

        self.call(
            token,
            "chat.postEphemeral",
            json!({
                "channel": channel_id,
                "thread_ts": root_id,
                "user": user_id,
                "text": "Pick a style for the next attempt",
                "blocks": [
                    { "type": "section", "text": { "type": "mrkdwn", "text": "Pick a style for the next attempt:" } },
                    { "type": "actions", "elements": buttons },
                ],
            }),
        )
        .await?;
        Ok(())
    }
}
