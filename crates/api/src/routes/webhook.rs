//! The webhook intake endpoint.
//!
//! `POST /events` receives platform event callbacks. The contract with
//! the platform is a fast acknowledgment: the signature is verified and
//! the envelope parsed synchronously, then the pipeline runs in a
//! spawned task and the 200 goes out immediately.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use quoteframe_chat::signature::verify_signature;
use quoteframe_core::event::ChatEvent;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Signing timestamp header, unix seconds.
pub const TIMESTAMP_HEADER: &str = "x-request-timestamp";

/// Signature header, `v0=<hex>`.
pub const SIGNATURE_HEADER: &str = "x-request-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(receive_event))
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    event: Option<InnerEvent>,
}

#[derive(Debug, Deserialize)]
struct InnerEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

/// Verify the request signature against the raw body.
pub(crate) fn require_signature(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), AppError> {
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing signing timestamp".into()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing signature".into()))?;

    if !verify_signature(
        &state.config.signing_secret,
        timestamp,
        body,
        signature,
        Utc::now().timestamp(),
    ) {
        return Err(AppError::Unauthorized("invalid signature".into()));
    }
    Ok(())
}

/// `POST /events`: signature-checked intake with fast ack.
async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    require_signature(&state, &headers, body.as_bytes())?;

    let envelope: EventEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("unparseable event envelope: {e}")))?;

    // Endpoint registration handshake: echo the challenge.
    if envelope.kind == "url_verification" {
        let challenge = envelope
            .challenge
            .ok_or_else(|| AppError::BadRequest("url_verification without challenge".into()))?;
        return Ok(Json(serde_json::json!({ "challenge": challenge })));
    }

    if envelope.kind != "event_callback" {
        tracing::debug!(kind = %envelope.kind, "Ignoring unhandled envelope type");
        return Ok(Json(serde_json::json!({ "ok": true })));
    }

    let (Some(team_id), Some(event)) = (envelope.team_id, envelope.event) else {
        return Err(AppError::BadRequest("event_callback missing team or event".into()));
    };
    if event.kind != "message" {
        tracing::debug!(kind = %event.kind, "Ignoring non-message event");
        return Ok(Json(serde_json::json!({ "ok": true })));
    }

    let normalized = ChatEvent {
        team_id,
        channel_id: event.channel,
        message_id: event.ts,
        user_id: event.user,
        text: event.text,
        thread_root_id: event.thread_ts,
        subtype: event.subtype,
    };

    // Ack now, work later: the platform retries slow responses, and a
    // retried delivery is exactly what the idempotency anchor absorbs.
    let intake = state.intake.clone();
    tokio::spawn(async move {
        match intake.handle(&normalized).await {
            Ok(outcome) => {
                tracing::debug!(outcome = ?outcome, "Intake finished");
            }
            Err(e) => {
                tracing::error!(error = %e, "Intake failed");
            }
        }
    });

    Ok(Json(serde_json::json!({ "ok": true })))
}
