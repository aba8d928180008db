//! OpenAI-compatible chat-completions client
//!
//! One client serves both pipeline roles: knowledge extraction through the
//! text model and OCR through the vision model (image sent as a data URI
//! content part). Transient failures are retried with exponential backoff;
//! authentication failures surface immediately.

use crate::LlmError;
use async_trait::async_trait;
use base64::Engine;
use knowflow_domain::traits::ChatProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of retry attempts for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default completion token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

const OCR_INSTRUCTION: &str = "Recognize and transcribe all text in the image, \
preserving the original structure and order. Output only the transcription, \
with no commentary.";

/// HTTP chat client for an OpenAI-compatible completions endpoint.
pub struct ChatClient {
    base_url: String,
    api_key: String,
    text_model: String,
    vision_model: String,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    /// Create a client for `base_url` (the full chat-completions URL).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        text_model: impl Into<String>,
        vision_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            text_model: text_model.into(),
            vision_model: vision_model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_retries: DEFAULT_MAX_RETRIES,
            client,
        })
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the completion token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send one request without retrying.
    async fn send_once(&self, model: &str, messages: &[WireMessage]) -> Result<String, LlmError> {
        let body = WireRequest {
            model,
            messages,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &detail));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("bad response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response had no message content".to_string()))
    }

    /// Send with the retry policy: exponential backoff (1s, 2s, 4s, ...),
    /// doubled for rate limits; auth errors are returned immediately.
    async fn send(&self, model: &str, messages: Vec<WireMessage>) -> Result<String, LlmError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.send_once(model, &messages).await {
                Ok(text) => {
                    debug!(model, attempt, "chat call succeeded");
                    return Ok(text);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt < self.max_retries {
                        let mut delay = Duration::from_secs(1 << attempt);
                        if matches!(e, LlmError::RateLimit) {
                            delay *= 2;
                        }
                        warn!(
                            model,
                            attempt = attempt + 1,
                            max = self.max_retries,
                            error = %e,
                            "chat call failed, retrying after {:?}",
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Other("retries exhausted".to_string())))
    }
}

fn classify_transport(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else if e.is_connect() || e.is_request() {
        LlmError::Network(e.to_string())
    } else {
        LlmError::Other(e.to_string())
    }
}

fn classify_status(status: u16, detail: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::Auth(format!("HTTP {}: {}", status, detail)),
        429 => LlmError::RateLimit,
        500.. => LlmError::Server(status),
        _ => LlmError::Other(format!("HTTP {}: {}", status, detail)),
    }
}

#[async_trait]
impl ChatProvider for ChatClient {
    type Error = LlmError;

    async fn chat(&self, system: Option<&str>, prompt: &str) -> Result<String, Self::Error> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(WireMessage {
                role: "system",
                content: WireContent::Text(system.to_string()),
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: WireContent::Text(prompt.to_string()),
        });

        self.send(&self.text_model, messages).await
    }

    async fn recognize(&self, mime: &str, image: &[u8]) -> Result<String, Self::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let messages = vec![WireMessage {
            role: "user",
            content: WireContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", mime, encoded),
                    },
                },
                ContentPart::Text {
                    text: OCR_INSTRUCTION.to_string(),
                },
            ]),
        }];

        self.send(&self.vision_model, messages).await
    }
}
