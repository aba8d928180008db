//! KnowFlow Storage Layer
//!
//! Two concerns live here:
//!
//! - **Sidecar persistence** ([`sidecar`]): the versioned JSON file written
//!   next to every ingested source (same path, `.zsd` extension). Version 3
//!   carries the raw source content and the tearing cursor; versions 1 and 2
//!   are read-compatible through a normalizing loader.
//! - **State ownership** ([`state`]): an explicit owner of the in-memory
//!   document map exposing get/update/subscribe, with change broadcast as a
//!   separate fire-and-forget notification decoupled from the mutation.
//!
//! Sidecar writes after a batch are best-effort: a failed save is logged and
//! the in-memory state stays committed; disk catches up on the next save.

#![warn(missing_docs)]

pub mod sidecar;
pub mod state;

use thiserror::Error;

pub use sidecar::{load, save, sidecar_path, SidecarFile, SourceFileType, SIDECAR_VERSION};
pub use state::{DocumentRecord, DocumentService, StoreEvent};

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sidecar version newer than this build understands
    #[error("unsupported sidecar version {0}")]
    UnsupportedVersion(u64),

    /// Structurally invalid sidecar content
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Raw content could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// No document with the given id
    #[error("document not found: {0}")]
    NotFound(String),
}
