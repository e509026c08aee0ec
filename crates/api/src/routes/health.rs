use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version, from Cargo metadata.
    pub version: &'static str,
    /// Whether the database answered a probe query.
    pub db_healthy: bool,
}

/// Build the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// `GET /health`: liveness plus a database probe.
///
/// Always returns 200; a broken database is reported in the body so load
/// balancers can distinguish "up but degraded" from "down".
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = quoteframe_db::health_check(&state.pool).await.is_ok();
    if !db_healthy {
        tracing::error!("Health check: database probe failed");
    }
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}
