//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod channel_repo;
pub mod event_repo;
pub mod generation_repo;
pub mod job_repo;
pub mod quote_repo;
pub mod style_repo;
pub mod usage_repo;
pub mod workspace_repo;

pub use channel_repo::ChannelRepo;
pub use event_repo::EventRepo;
pub use generation_repo::GenerationRepo;
pub use job_repo::JobRepo;
pub use quote_repo::QuoteRepo;
pub use style_repo::StyleRepo;
pub use usage_repo::UsageRepo;
pub use workspace_repo::WorkspaceRepo;
