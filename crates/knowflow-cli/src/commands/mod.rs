//! Command implementations.

mod batch;
mod ingest;
mod questions;
mod status;

pub use batch::execute_batch;
pub use ingest::execute_ingest;
pub use questions::execute_questions;
pub use status::{execute_context, execute_status};

use knowflow_store::sidecar_path;
use std::path::{Path, PathBuf};

/// Accept either a source file or its sidecar directly.
pub(crate) fn resolve_sidecar(file: &Path) -> PathBuf {
    match file.extension().and_then(|e| e.to_str()) {
        Some("zsd") => file.to_path_buf(),
        _ => sidecar_path(file),
    }
}
