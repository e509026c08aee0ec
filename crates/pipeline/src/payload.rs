//! The queued-job wire contract between intake and the worker.
//!
//! Everything the worker needs to run an attempt end to end is carried in
//! the payload; the worker re-reads live rows only for idempotency and
//! watermark decisions, never to reconstruct the request.

use serde::{Deserialize, Serialize};

use quoteframe_core::types::DbId;

/// Payload for one generation delivery.
///
/// Optional fields use `#[serde(default)]` so older payloads already in
/// the queue keep deserializing across deploys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub workspace_id: DbId,
    pub channel_id: DbId,
    pub quote_id: DbId,
    pub generation_id: DbId,

    /// Platform channel the source message lives in.
    pub platform_channel_id: String,
    /// Alternate destination channel for the artifact reply, if configured.
    #[serde(default)]
    pub reply_channel_id: Option<String>,
    /// Thread anchor for the artifact reply.
    pub source_message_id: String,

    pub quote_text: String,
    #[serde(default)]
    pub attributed_to: Option<String>,

    /// Selected style template id; absent when a free-text override won.
    #[serde(default)]
    pub style_id: Option<DbId>,
    /// Free-text style description overriding the template.
    #[serde(default)]
    pub style_override: Option<String>,

    pub plan_tier: String,
    /// Output edge length in pixels.
    pub output_size: i32,
    /// Model quality hint, e.g. `"standard"`.
    pub quality: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
