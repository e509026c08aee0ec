//! [`ArtifactGenerator`]: prompt construction plus the single
//! soften-and-retry pass on content-policy rejection.
//!
//! A second rejection is a recognized outcome (`Ok(None)`), not an error;
//! any non-policy failure propagates so the worker can treat it as a real
//! processing failure.

use quoteframe_core::prompt::{build_prompt, soften_prompt};

use crate::model::{ImageModel, ImageModelError, ImageOutput, ImageRequest};

/// A successfully generated artifact and the prompt that produced it.
#[derive(Debug)]
pub struct Artifact {
    pub image: ImageOutput,
    pub prompt: String,
}

/// Wraps an [`ImageModel`] with the pipeline's generation policy.
pub struct ArtifactGenerator<M> {
    model: M,
}

impl<M: ImageModel> ArtifactGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Generate an artifact for a quote.
    ///
    /// Returns `Ok(None)` when the model declined both the original and
    /// the softened prompt; the caller posts the text-only fallback.
    pub async fn generate(
        &self,
        quote_text: &str,
        style_template: &str,
        style_override: Option<&str>,
        size: u32,
        quality: &str,
    ) -> Result<Option<Artifact>, ImageModelError> {
        let prompt = build_prompt(style_template, style_override, quote_text);
        let request = ImageRequest {
            prompt: prompt.clone(),
            size,
            quality: quality.into(),
        };

        match self.model.generate(&request).await {
            Ok(image) => Ok(Some(Artifact { image, prompt })),
            Err(ImageModelError::ContentPolicy { code }) => {
                tracing::info!(code = %code, "Prompt rejected by content policy, retrying softened");
                let softened = soften_prompt(&prompt);
                let retry = ImageRequest {
                    prompt: softened.clone(),
                    size,
                    quality: quality.into(),
                };
                match self.model.generate(&retry).await {
                    Ok(image) => Ok(Some(Artifact {
                        image,
                        prompt: softened,
                    })),
                    Err(ImageModelError::ContentPolicy { code }) => {
                        tracing::info!(code = %code, "Softened prompt also rejected, declining");
                        Ok(None)
                    }
                    Err(other) => Err(other),
                }
            }
            Err(other) => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
