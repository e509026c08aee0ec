//! HTTP client for the hosted image model API.
//!
//! Speaks an OpenAI-style `/images/generations` endpoint with base64
//! response payloads. Policy rejections arrive as a structured error code
//! in the JSON body and are mapped to
//! [`ImageModelError::ContentPolicy`](crate::ImageModelError::ContentPolicy).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::model::{ImageModel, ImageModelError, ImageOutput, ImageRequest};

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model name.
const DEFAULT_MODEL: &str = "dall-e-3";

/// Image generation can take a while; be generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Provider error code for content-policy rejections.
const CONTENT_POLICY_CODE: &str = "content_policy_violation";

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Vec<GenerationDatum>,
}

#[derive(Debug, Deserialize)]
struct GenerationDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

/// Client for the hosted image model.
pub struct HttpImageModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpImageModel {
    /// Create a client against the default API root.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a client against a custom API root (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
        }
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ImageModel for HttpImageModel {
    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput, ImageModelError> {
        let url = format!("{}/images/generations", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "n": 1,
            "size": format!("{0}x{0}", request.size),
            "quality": request.quality,
            "response_format": "b64_json",
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let parsed: Result<ErrorResponse, _> = response.json().await;
            return Err(match parsed {
                Ok(err) if err.error.code.as_deref() == Some(CONTENT_POLICY_CODE) => {
                    ImageModelError::ContentPolicy {
                        code: CONTENT_POLICY_CODE.into(),
                    }
                }
                Ok(err) => ImageModelError::Api {
                    status: status.as_u16(),
                    message: err.error.message,
                },
                Err(_) => ImageModelError::Api {
                    status: status.as_u16(),
                    message: "unparseable error response".into(),
                },
            });
        }

        let payload: GenerationResponse = response.json().await?;
        let datum = payload
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ImageModelError::Decode("empty data array".into()))?;

        if let Some(b64) = datum.b64_json {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| ImageModelError::Decode(format!("invalid base64: {e}")))?;
            return Ok(ImageOutput::Bytes(bytes));
        }
        if let Some(url) = datum.url {
            return Ok(ImageOutput::Url(url));
        }
        Err(ImageModelError::Decode(
            "response carried neither b64_json nor url".into(),
        ))
    }
}
