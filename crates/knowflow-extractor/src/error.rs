//! Error types for the extraction core

use thiserror::Error;

/// Errors that can occur during batch extraction.
///
/// Note that a malformed model response is NOT represented here: that is an
/// expected outcome, handled by the layered parser as a zero-yield batch.
/// These variants are orchestration-level failures that roll a batch back.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// LLM transport failure surfaced after the provider's retry policy
    #[error("LLM error: {0}")]
    Llm(String),

    /// OCR failure for a PDF page or image
    #[error("OCR error: {0}")]
    Ocr(String),

    /// PDF page rasterization failure
    #[error("rasterizer error: {0}")]
    Rasterize(String),

    /// Source payload did not match its declared kind
    #[error("source error: {0}")]
    Source(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
