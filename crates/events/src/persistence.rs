//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and writes every received [`PipelineEvent`] to the
//! `events` table. It runs as a long-lived background task and shuts down
//! when the bus sender is dropped.

use tokio::sync::broadcast;

use quoteframe_db::repositories::EventRepo;
use quoteframe_db::DbPool;

use crate::bus::PipelineEvent;

/// Background service that persists pipeline events to the database.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the bus channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PipelineEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write a single event to the `events` table.
    async fn persist(pool: &DbPool, event: &PipelineEvent) -> Result<(), sqlx::Error> {
        EventRepo::insert(
            pool,
            &event.event_type,
            event.source_entity_type.as_deref(),
            event.source_entity_id,
            &event.payload,
        )
        .await?;
        Ok(())
    }
}
