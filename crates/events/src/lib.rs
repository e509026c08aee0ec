//! QuoteFrame pipeline event infrastructure.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`]: the canonical event envelope.
//! - [`EventPersistence`]: background service that writes every event to
//!   the `events` table.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, PipelineEvent};
pub use persistence::EventPersistence;
