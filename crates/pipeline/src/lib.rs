//! QuoteFrame pipeline orchestration.
//!
//! The webhook side ([`PipelineIntake`]) turns normalized chat events
//! into a transactionally created quote/generation pair plus a queued
//! job; the delivery side ([`JobWorker`]) turns a queued job into a
//! posted artifact and settled records. The seams between them
//! ([`QuoteDetector`], [`JobQueue`], [`BlobStore`], plus the chat and
//! image-model traits) are all substitutable in tests.

pub mod blob;
pub mod detector;
pub mod intake;
pub mod payload;
pub mod queue;
pub mod regrant;
pub mod worker;

pub use blob::{BlobError, BlobStore, S3BlobStore};
pub use detector::{Detection, DetectorError, HttpQuoteDetector, QuoteDetector, StyleCandidate};
pub use intake::{IntakeError, IntakeOutcome, PipelineIntake};
pub use payload::GenerationJob;
pub use queue::{JobQueue, PgJobQueue, QueueError};
pub use regrant::MentionOutcome;
pub use worker::{JobWorker, WorkerError, WorkerOutcome};
