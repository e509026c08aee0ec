//! Domain logic for the QuoteFrame pipeline.
//!
//! This crate has no internal dependencies and no I/O. It holds the shared
//! type aliases, the domain error type, and the pure pieces of the pipeline:
//! event filtering, entitlement math, style selection, prompt construction,
//! and image post-processing.

pub mod entitlement;
pub mod error;
pub mod event;
pub mod imageops;
pub mod prompt;
pub mod status;
pub mod style;
pub mod types;
