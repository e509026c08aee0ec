//! Image model integration: the [`ImageModel`] seam, an HTTP client for
//! the hosted model API, and the [`ArtifactGenerator`] that owns the
//! soften-and-retry content-policy handling.

pub mod client;
pub mod generator;
pub mod model;

pub use generator::{Artifact, ArtifactGenerator};
pub use model::{ImageModel, ImageModelError, ImageOutput, ImageRequest};
