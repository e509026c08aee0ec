//! Entity models: `FromRow` structs plus Create/Update DTOs.

pub mod channel;
pub mod event;
pub mod generation;
pub mod job;
pub mod quote;
pub mod style;
pub mod usage;
pub mod workspace;
