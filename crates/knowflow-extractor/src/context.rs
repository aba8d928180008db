//! Learning-context maintenance
//!
//! Folds one batch's outcome into the cross-batch memory: path changes,
//! recent-knowledge summaries, the pending fragment, and the sticky
//! document/region types. Finalization runs once the source is exhausted.

use knowflow_domain::context::{MAX_PATH_DEPTH, MAX_RECENT_KNOWLEDGE};
use knowflow_domain::{DocumentType, KnowledgeSummary, LearningContext, RegionType};
use tracing::info;

/// One batch's contribution to the learning context.
#[derive(Debug, Clone, Default)]
pub struct ContextUpdate {
    /// New hierarchy segment entered during the batch, if any
    pub path_change: Option<String>,
    /// Replacement for the pending fragment (always applied; `None` clears)
    pub fragment: Option<String>,
    /// Region reported by the model; only applied when present
    pub region_type: Option<RegionType>,
    /// Detected document type; only applied when present
    pub document_type: Option<DocumentType>,
    /// Summaries of the knowledge points produced by the batch
    pub new_knowledge: Vec<KnowledgeSummary>,
}

/// Advance the context after a committed batch.
pub fn update_context(context: &mut LearningContext, update: ContextUpdate) {
    if let Some(segment) = update.path_change {
        context.current_path.push(segment);
        if context.current_path.len() > MAX_PATH_DEPTH {
            let excess = context.current_path.len() - MAX_PATH_DEPTH;
            context.current_path.drain(..excess);
        }
    }

    if !update.new_knowledge.is_empty() {
        // Recency bias: last 10 of what we had, plus up to the 10 newest,
        // trimmed to the most recent 15.
        let keep_existing = context.recent_knowledge.len().saturating_sub(10);
        let mut recent: Vec<KnowledgeSummary> =
            context.recent_knowledge[keep_existing..].to_vec();
        let keep_new = update.new_knowledge.len().saturating_sub(10);
        recent.extend_from_slice(&update.new_knowledge[keep_new..]);
        let start = recent.len().saturating_sub(MAX_RECENT_KNOWLEDGE);
        context.recent_knowledge = recent.split_off(start);
    }

    context.pending.fragment = update.fragment;

    if let Some(document_type) = update.document_type {
        context.document_type = Some(document_type);
    }
    if let Some(region) = update.region_type {
        context.current_region = Some(region);
    }
}

/// Finalize the context when the source is exhausted: the fragment is
/// cleared unconditionally, the unresolved queues stay as a diagnostic
/// record of what never matched.
pub fn finalize_context(context: &mut LearningContext) {
    if !context.pending.exercises_awaiting_answer.is_empty() {
        info!(
            count = context.pending.exercises_awaiting_answer.len(),
            "document finished with exercises still awaiting answers"
        );
    }
    if !context.pending.answers_awaiting_question.is_empty() {
        info!(
            count = context.pending.answers_awaiting_question.len(),
            "document finished with answers that never found their exercises"
        );
    }
    context.pending.fragment = None;
}
