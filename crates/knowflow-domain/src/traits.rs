//! Trait seams for external collaborators
//!
//! These traits are the boundary between the extraction core and the
//! capabilities it invokes but does not own: the LLM chat endpoint (which
//! also serves OCR through a vision model) and PDF page rasterization.
//! Implementations live in infrastructure crates; tests use mocks.

use async_trait::async_trait;
use std::fmt;

/// An LLM chat collaborator.
///
/// The transport owns its own timeout and retry policy; callers see either
/// the final response text or a terminal error.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Error type surfaced after the provider's retry policy is exhausted
    type Error: fmt::Display + Send;

    /// Send one instruction and return the raw response text.
    async fn chat(&self, system: Option<&str>, prompt: &str) -> Result<String, Self::Error>;

    /// Recognize the text content of an image (OCR via a vision model).
    async fn recognize(&self, mime: &str, image: &[u8]) -> Result<String, Self::Error>;
}

/// PDF page rasterization collaborator.
pub trait PageRasterizer: Send + Sync {
    /// Error type for rasterization failures
    type Error: fmt::Display + Send;

    /// Number of pages in the PDF.
    fn page_count(&self, pdf: &[u8]) -> Result<u32, Self::Error>;

    /// Render one page (1-based) to PNG bytes.
    fn rasterize_png(&self, pdf: &[u8], page: u32) -> Result<Vec<u8>, Self::Error>;
}
