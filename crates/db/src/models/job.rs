//! Queue job entity model.

use serde::Serialize;
use sqlx::FromRow;

use quoteframe_core::types::{DbId, Timestamp};

/// A row from the `jobs` table: one queued generation delivery.
///
/// The payload is the wire contract between intake and the worker; the
/// queue itself never inspects it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub payload: serde_json::Value,
    pub status: String,
    /// Delivery attempts so far (incremented on claim).
    pub attempts: i32,
    pub max_attempts: i32,
    /// Earliest time the next delivery may happen (backoff scheduling).
    pub next_attempt_at: Timestamp,
    pub locked_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Queue job statuses, stored as lowercase TEXT.
pub mod job_status {
    pub const PENDING: &str = "pending";
    pub const RUNNING: &str = "running";
    pub const COMPLETED: &str = "completed";
    /// All delivery attempts used up; dead-lettered.
    pub const EXHAUSTED: &str = "exhausted";
}
