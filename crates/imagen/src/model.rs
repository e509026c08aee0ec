//! The image model seam.

use async_trait::async_trait;

/// Parameters for one model invocation.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    /// Square edge length, e.g. 1024 for a 1024×1024 render.
    pub size: u32,
    /// Provider quality knob, passed through verbatim.
    pub quality: String,
}

/// What the model produced: raw bytes or a short-lived download URL.
#[derive(Debug, Clone)]
pub enum ImageOutput {
    Bytes(Vec<u8>),
    Url(String),
}

/// Errors from the image model client.
///
/// Content-policy rejections are a dedicated variant constructed from the
/// provider's structured error code; downstream code matches on the
/// variant, never on message text.
#[derive(Debug, thiserror::Error)]
pub enum ImageModelError {
    /// The model declined the prompt on content-policy grounds.
    #[error("Content policy rejection: {code}")]
    ContentPolicy { code: String },

    /// The underlying HTTP request failed (network, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-policy API error.
    #[error("Image API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response payload could not be decoded.
    #[error("Failed to decode image payload: {0}")]
    Decode(String),
}

impl ImageModelError {
    /// True for the content-policy variant specifically.
    pub fn is_content_policy(&self) -> bool {
        matches!(self, ImageModelError::ContentPolicy { .. })
    }
}

/// One generation call against the external model.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput, ImageModelError>;
}

/// Resolve an [`ImageOutput`] into raw bytes, downloading if the provider
/// handed back a URL.
pub async fn resolve_bytes(output: ImageOutput) -> Result<Vec<u8>, ImageModelError> {
    match output {
        ImageOutput::Bytes(bytes) => Ok(bytes),
        ImageOutput::Url(url) => {
            let response = reqwest::get(&url).await?;
            if !response.status().is_success() {
                return Err(ImageModelError::Api {
                    status: response.status().as_u16(),
                    message: format!("image download from {url} failed"),
                });
            }
            Ok(response.bytes().await?.to_vec())
        }
    }
}
