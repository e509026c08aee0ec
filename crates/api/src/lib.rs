//! QuoteFrame webhook API server.
//!
//! Receives platform event callbacks and interactive-component
//! submissions, verifies their signatures, and feeds them to the
//! pipeline with a fast acknowledgment.

pub mod config;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;
