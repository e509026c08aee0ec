use std::sync::Arc;

use quoteframe_chat::HttpChatClient;
use quoteframe_pipeline::detector::HttpQuoteDetector;
use quoteframe_pipeline::queue::PgJobQueue;
use quoteframe_pipeline::PipelineIntake;

use crate::config::ServerConfig;

/// The production intake wiring: hosted detector, Postgres queue, HTTP
/// chat client.
pub type ApiIntake = PipelineIntake<HttpQuoteDetector, PgJobQueue, HttpChatClient>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: quoteframe_db::DbPool,
    /// Server configuration (signing secret, timeouts).
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing pipeline events.
    pub event_bus: Arc<quoteframe_events::EventBus>,
    /// The webhook-side pipeline orchestrator.
    pub intake: Arc<ApiIntake>,
}
