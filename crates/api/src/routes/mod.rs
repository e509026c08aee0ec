//! Route definitions, one module per endpoint group.

pub mod health;
pub mod interactions;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// All webhook-facing routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(webhook::router())
        .merge(interactions::router())
}
