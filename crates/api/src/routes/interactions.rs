//! The interactive-component callback endpoint.
//!
//! `POST /interactions` receives style-picker selections. Same signature
//! scheme and fast-ack contract as the event webhook.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use quoteframe_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::routes::webhook::require_signature;
use crate::state::AppState;

/// Action id prefix carried by picker buttons.
const PICK_STYLE_PREFIX: &str = "pick_style_";

pub fn router() -> Router<AppState> {
    Router::new().route("/interactions", post(receive_interaction))
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    team_id: String,
    channel_id: String,
    /// Thread root the picker was posted under.
    root_message_id: String,
    user_id: String,
    /// e.g. `"pick_style_42"`.
    action_id: String,
}

fn parse_style_id(action_id: &str) -> Option<DbId> {
    action_id.strip_prefix(PICK_STYLE_PREFIX)?.parse().ok()
}

/// `POST /interactions`: picker selection callback.
async fn receive_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    require_signature(&state, &headers, body.as_bytes())?;

    let payload: InteractionPayload = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("unparseable interaction payload: {e}")))?;

    let Some(style_id) = parse_style_id(&payload.action_id) else {
        tracing::debug!(action_id = %payload.action_id, "Ignoring unknown interaction action");
        return Ok(Json(serde_json::json!({ "ok": true })));
    };

    let intake = state.intake.clone();
    tokio::spawn(async move {
        match intake
            .complete_picker_selection(
                &payload.team_id,
                &payload.channel_id,
                &payload.root_message_id,
                &payload.user_id,
                style_id,
            )
            .await
        {
            Ok(outcome) => {
                tracing::debug!(outcome = ?outcome, "Picker selection finished");
            }
            Err(e) => {
                tracing::error!(error = %e, "Picker selection failed");
            }
        }
    });

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_id_parsing() {
        assert_eq!(parse_style_id("pick_style_42"), Some(42));
        assert_eq!(parse_style_id("pick_style_"), None);
        assert_eq!(parse_style_id("open_settings"), None);
    }
}
