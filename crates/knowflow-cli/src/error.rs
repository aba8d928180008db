//! CLI error type

use thiserror::Error;

/// Errors surfaced to the terminal user.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration problem (missing key, bad value)
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad command-line argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar load/save error
    #[error(transparent)]
    Store(#[from] knowflow_store::StoreError),

    /// Extraction pipeline error
    #[error(transparent)]
    Extractor(#[from] knowflow_extractor::ExtractorError),

    /// LLM client error
    #[error(transparent)]
    Llm(#[from] knowflow_llm::LlmError),
}

/// Result alias used across the CLI.
pub type Result<T> = std::result::Result<T, CliError>;
