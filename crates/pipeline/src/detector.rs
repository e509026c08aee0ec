//! AI quote detection.
//!
//! [`QuoteDetector`] is the classification seam; [`HttpQuoteDetector`]
//! implements it against an OpenAI-style chat-completions endpoint that
//! is instructed to answer with a single JSON object.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use quoteframe_core::types::DbId;

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default classification model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Classification is quick; fail fast so the webhook path stays snappy.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Below this the message is treated as not-a-quote even when the model
/// says otherwise.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// A style the detector may recommend, by name.
#[derive(Debug, Clone)]
pub struct StyleCandidate {
    pub id: DbId,
    pub name: String,
}

/// Outcome of classifying one message.
#[derive(Debug, Clone)]
pub struct Detection {
    pub is_quote: bool,
    /// Cleaned quote text (mention markup and quotation marks stripped).
    pub quote_text: String,
    pub attributed_to: Option<String>,
    pub confidence: f64,
    /// Resolved id of the style the model recommended, when it named one
    /// of the offered candidates.
    pub style_hint: Option<DbId>,
}

/// Errors from the detector transport.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Detector API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unparseable detector response: {0}")]
    Decode(String),
}

/// The quote classification seam.
#[async_trait]
pub trait QuoteDetector: Send + Sync {
    /// Classify `text`. `candidates` is the channel's enabled style set,
    /// offered so the model can recommend one by name.
    async fn classify(
        &self,
        text: &str,
        candidates: &[StyleCandidate],
    ) -> Result<Detection, DetectorError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// The JSON object the model is instructed to produce.
#[derive(Debug, Deserialize)]
struct DetectionPayload {
    is_quote: bool,
    #[serde(default)]
    quote_text: Option<String>,
    #[serde(default)]
    attributed_to: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    suggested_style: Option<String>,
}

/// Detector backed by a hosted chat-completion model.
pub struct HttpQuoteDetector {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpQuoteDetector {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Client against a custom API root (tests, proxies).
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

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn system_prompt(candidates: &[StyleCandidate]) -> String {
        let style_names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        format!(
            "You classify chat messages. Decide whether the message is a \
             quotable statement worth memorializing as art: witty, profound, \
             absurd, or otherwise remarkable. Routine conversation, questions, \
             and logistics are not quotes. Respond with exactly one JSON \
             object: {{\"is_quote\": bool, \"quote_text\": string, \
             \"attributed_to\": string or null, \"confidence\": number 0-1, \
             \"suggested_style\": string or null}}. quote_text is the cleaned \
             quote with mention markup and surrounding quotation marks \
             stripped. suggested_style, if any, must be one of: {}.",
            style_names.join(", ")
        )
    }
}

#[async_trait]
impl QuoteDetector for HttpQuoteDetector {
    async fn classify(
        &self,
        text: &str,
        candidates: &[StyleCandidate],
    ) -> Result<Detection, DetectorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": Self::system_prompt(candidates)},
                {"role": "user", "content": text},
            ],
            "response_format": {"type": "json_object"},
            "temperature": 0.0,
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
            let message = response.text().await.unwrap_or_default();
            return Err(DetectorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DetectorError::Decode("empty choices array".into()))?;

        let payload: DetectionPayload = serde_json::from_str(&content)
            .map_err(|e| DetectorError::Decode(format!("invalid detection JSON: {e}")))?;

        let style_hint = payload.suggested_style.as_deref().and_then(|name| {
            candidates
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .map(|c| c.id)
        });

        Ok(Detection {
            is_quote: payload.is_quote && payload.confidence >= MIN_CONFIDENCE,
            quote_text: payload.quote_text.unwrap_or_else(|| text.to_string()),
            attributed_to: payload.attributed_to,
            confidence: payload.confidence,
            style_hint,
        })
    }
}
