//! KnowFlow Domain Layer
//!
//! This crate contains the core data model shared by every other layer:
//! knowledge points, the cross-batch learning context, document and source
//! descriptors, generated practice questions, and the trait seams behind
//! which the external collaborators (LLM chat, OCR, PDF rasterization) live.
//!
//! ## Key Concepts
//!
//! - **KnowledgePoint**: one self-contained extracted unit of content
//! - **LearningContext**: the memory carried between extraction batches
//! - **SourceDescriptor**: a raw source plus its monotonically advancing cursor
//! - **Document**: the persistent knowledge tree and batch bookkeeping
//!
//! Infrastructure implementations live in other crates; this crate keeps to
//! pure data and invariants.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod document;
pub mod knowledge;
pub mod question;
pub mod source;
pub mod traits;

// Re-exports for convenience
pub use context::{
    BoundedQueue, DocumentType, LearningContext, PendingAnswer, PendingExercise, PendingState,
    RegionType,
};
pub use document::{Document, DocumentStatus};
pub use knowledge::{build_ancestor_paths, KnowledgePoint, KnowledgeSummary, KnowledgeType};
pub use question::{Difficulty, Question, QuestionSession, QuestionType};
pub use source::{SourceDescriptor, SourceKind, SourcePayload};

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
