//! KnowFlow Extractor
//!
//! The incremental extraction pipeline: tears a source into bounded units,
//! composes archetype-aware prompts around the cross-batch learning context,
//! recovers structure from whatever JSON the model returns, reconciles
//! out-of-order exercise answers, and merges batches into the document's
//! knowledge tree with collision-free ids.
//!
//! # Architecture
//!
//! ```text
//! Source ─ ChunkReader ─ PromptBuilder ─ LLM ─ parser ─ normalize
//!                                                          │
//!        Document ◄─ BatchRunner ◄─ remap ◄─ answers ◄─────┘
//!                         │
//!                  LearningContext
//! ```
//!
//! The extractor guarantees deterministic bookkeeping around a
//! non-deterministic model: offsets only move forward, ids stay unique
//! across batches and workers, and a malformed response costs one unit's
//! yield, never the document's position.
//!
//! # Example
//!
//! ```no_run
//! use knowflow_extractor::{BatchRunner, ExtractorConfig};
//! use knowflow_llm::{MockProvider, MockRasterizer};
//! use knowflow_domain::{Document, SourceDescriptor};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(MockProvider::new(r#"{"knowledgePoints":[]}"#));
//! let rasterizer = Arc::new(MockRasterizer::new(1));
//! let runner = BatchRunner::new(provider, rasterizer, ExtractorConfig::default())?;
//!
//! let mut source = SourceDescriptor::from_text("Theorem 1. ...", "notes.txt");
//! let mut document = Document::new(source.display_name(), source.total_units);
//!
//! let report = runner.run_batch(&mut document, &mut source).await?;
//! println!("produced {} knowledge points", report.produced);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod answers;
pub mod batch;
pub mod chunking;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod normalize;
pub mod numbering;
pub mod parser;
pub mod prompt;
pub mod questions;
pub mod remap;


pub use batch::{BatchReport, BatchRunner};
pub use chunking::{next_text_chunk, ChunkReader, ChunkUnit};
pub use classify::classify;
pub use config::ExtractorConfig;
pub use context::{finalize_context, update_context, ContextUpdate};
pub use error::ExtractorError;
pub use normalize::{normalize_response, ExtractionResponse};
pub use numbering::{normalize_question_number, question_numbers_match};
pub use parser::{parse_model_json, ParseFailure, ParseMethod, ParsedJson};
pub use prompt::PromptBuilder;
pub use questions::{QuestionGenerator, QuestionRequest, QuestionYield};
