//! KnowFlow LLM Provider Layer
//!
//! Implementations of the `ChatProvider` trait from `knowflow-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: deterministic mock for testing
//! - `ChatClient`: OpenAI-compatible chat-completions HTTP client, used for
//!   both extraction (text model) and OCR (vision model with an image part)
//!
//! The client owns the transport policy the extraction core relies on:
//! errors are classified (auth / rate-limit / timeout / network / server /
//! invalid-response), auth failures are terminal, and everything else is
//! retried with exponential backoff before surfacing.
//!
//! # Examples
//!
//! ```
//! use knowflow_llm::MockProvider;
//! use knowflow_domain::traits::ChatProvider;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.chat(None, "test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod client;

use async_trait::async_trait;
use knowflow_domain::traits::{ChatProvider, PageRasterizer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use client::ChatClient;

/// Errors that can occur during LLM operations.
///
/// Only [`LlmError::Auth`] is terminal; every other variant is considered
/// transient and retried by the client before it reaches the caller.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Invalid or expired credentials (HTTP 401/403); never retried
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Rate limit exceeded (HTTP 429); retried after a longer backoff
    #[error("rate limit exceeded")]
    RateLimit,

    /// The request timed out
    #[error("request timed out")]
    Timeout,

    /// Network or connection failure
    #[error("network error: {0}")]
    Network(String),

    /// Server-side failure (HTTP 5xx)
    #[error("server error (HTTP {0})")]
    Server(u16),

    /// Response did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Anything else
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether the client should retry after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::Auth(_))
    }
}

/// Mock provider for deterministic testing.
///
/// Returns pre-configured responses without network calls. Clones share
/// call counts and response tables.
///
/// # Examples
///
/// ```
/// use knowflow_llm::MockProvider;
/// use knowflow_domain::traits::ChatProvider;
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let mut provider = MockProvider::new("default");
/// provider.add_response("specific prompt", "specific reply");
/// assert_eq!(provider.chat(None, "specific prompt").await.unwrap(), "specific reply");
/// assert_eq!(provider.chat(None, "anything else").await.unwrap(), "default");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    ocr_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    queued: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// Create a provider returning `response` for every chat prompt.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            ocr_response: "mock ocr text".to_string(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            queued: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Set a specific response for an exact prompt.
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(prompt.into(), response.into());
    }

    /// Queue responses returned in order for successive chat calls
    /// (takes precedence over prompt matching while non-empty).
    pub fn queue_responses<I, S>(&mut self, responses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queued = self.queued.lock().unwrap();
        // Stored back-to-front so pop() yields in queue order
        for r in responses {
            queued.insert(0, r.into());
        }
    }

    /// Configure an error for a specific prompt.
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(prompt.into(), "ERROR".to_string());
    }

    /// Set the text returned by `recognize`.
    pub fn set_ocr_response(&mut self, text: impl Into<String>) {
        self.ocr_response = text.into();
    }

    /// Number of chat calls made so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    type Error = LlmError;

    async fn chat(&self, _system: Option<&str>, prompt: &str) -> Result<String, Self::Error> {
        *self.call_count.lock().unwrap() += 1;

        if let Some(next) = self.queued.lock().unwrap().pop() {
            return Ok(next);
        }

        let responses = self.responses.lock().unwrap();
        if let Some(response) = responses.get(prompt) {
            if response == "ERROR" {
                return Err(LlmError::Other("mock error".to_string()));
            }
            return Ok(response.clone());
        }

        Ok(self.default_response.clone())
    }

    async fn recognize(&self, _mime: &str, _image: &[u8]) -> Result<String, Self::Error> {
        Ok(self.ocr_response.clone())
    }
}

/// Mock rasterizer for tests: fixed page count, stub PNG bytes.
#[derive(Debug, Clone)]
pub struct MockRasterizer {
    pages: u32,
}

impl MockRasterizer {
    /// Create a rasterizer reporting `pages` pages for any PDF.
    pub fn new(pages: u32) -> Self {
        Self { pages }
    }
}

impl PageRasterizer for MockRasterizer {
    type Error = LlmError;

    fn page_count(&self, _pdf: &[u8]) -> Result<u32, Self::Error> {
        Ok(self.pages)
    }

    fn rasterize_png(&self, _pdf: &[u8], page: u32) -> Result<Vec<u8>, Self::Error> {
        if page == 0 || page > self.pages {
            return Err(LlmError::Other(format!("page {} out of range", page)));
        }
        Ok(vec![0x89, b'P', b'N', b'G', page as u8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_response() {
        let provider = MockProvider::new("reply");
        assert_eq!(provider.chat(None, "any").await.unwrap(), "reply");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_specific_responses() {
        let mut provider = MockProvider::new("default");
        provider.add_response("hello", "world");
        assert_eq!(provider.chat(None, "hello").await.unwrap(), "world");
        assert_eq!(provider.chat(None, "other").await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_mock_queued_responses_in_order() {
        let mut provider = MockProvider::new("default");
        provider.queue_responses(["first", "second"]);
        assert_eq!(provider.chat(None, "a").await.unwrap(), "first");
        assert_eq!(provider.chat(None, "b").await.unwrap(), "second");
        assert_eq!(provider.chat(None, "c").await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_mock_error_injection() {
        let mut provider = MockProvider::new("default");
        provider.add_error("bad prompt");
        let result = provider.chat(None, "bad prompt").await;
        assert!(matches!(result, Err(LlmError::Other(_))));
    }

    #[tokio::test]
    async fn test_mock_clone_shares_call_count() {
        let provider = MockProvider::new("x");
        let clone = provider.clone();
        provider.chat(None, "p").await.unwrap();
        assert_eq!(clone.call_count(), 1);
    }

    #[test]
    fn test_auth_is_terminal() {
        assert!(!LlmError::Auth("bad key".to_string()).is_retryable());
        assert!(LlmError::RateLimit.is_retryable());
        assert!(LlmError::Server(503).is_retryable());
        assert!(LlmError::Timeout.is_retryable());
    }

    #[test]
    fn test_mock_rasterizer_bounds() {
        let raster = MockRasterizer::new(3);
        assert_eq!(raster.page_count(b"pdf").unwrap(), 3);
        assert!(raster.rasterize_png(b"pdf", 3).is_ok());
        assert!(raster.rasterize_png(b"pdf", 4).is_err());
        assert!(raster.rasterize_png(b"pdf", 0).is_err());
    }
}
