//! Domain error type shared across the workspace.

use crate::types::DbId;

/// Domain-level error. HTTP-specific classification lives in the API crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup came up empty.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed a domain validation rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with existing state (e.g. a duplicate).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Image decode/encode/transform failure.
    #[error("Image processing error: {0}")]
    Image(String),

    /// Anything else that should surface as an internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
