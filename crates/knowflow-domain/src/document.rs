//! Documents - the persistent knowledge tree plus batch bookkeeping

use crate::context::LearningContext;
use crate::knowledge::KnowledgePoint;
use crate::question::QuestionSession;
use serde::{Deserialize, Serialize};

/// Processing status surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Idle, awaiting the next batch trigger
    #[default]
    Pending,
    /// A batch is running
    Processing,
    /// Every unit of the source has been consumed
    Done,
}

/// One ingested document: its extracted knowledge tree, the learning
/// context carried between batches, and progress counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Stable identifier
    pub id: String,
    /// Display name (file name without extension)
    pub name: String,
    /// Merged knowledge tree across all batches
    #[serde(default)]
    pub knowledge_points: Vec<KnowledgePoint>,
    /// Cumulative knowledge point count
    #[serde(default)]
    pub processed_count: usize,
    /// Current status
    #[serde(default)]
    pub status: DocumentStatus,
    /// Units consumed (mirrors the source descriptor's cursor)
    #[serde(default)]
    pub content_cursor: u64,
    /// Total units in the source
    #[serde(default)]
    pub content_total: u64,
    /// True while unconsumed units remain
    #[serde(default)]
    pub has_more: bool,
    /// Number of committed batches
    #[serde(default)]
    pub batch_index: u32,
    /// Target knowledge point count for the current batch
    #[serde(default)]
    pub batch_target: usize,
    /// Knowledge points produced by the last committed batch
    #[serde(default)]
    pub batch_produced_count: usize,
    /// Cross-batch memory
    #[serde(default)]
    pub learning_context: LearningContext,
    /// Generated practice question sessions
    #[serde(default)]
    pub question_sessions: Vec<QuestionSession>,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
    /// Last mutation timestamp (epoch millis)
    pub updated_at: u64,
}

impl Document {
    /// Create a fresh document for a source with `total` units.
    pub fn new(name: impl Into<String>, total: u64) -> Self {
        let now = crate::epoch_millis();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            knowledge_points: Vec::new(),
            processed_count: 0,
            status: DocumentStatus::Pending,
            content_cursor: 0,
            content_total: total,
            has_more: total > 0,
            batch_index: 0,
            batch_target: 10,
            batch_produced_count: 0,
            learning_context: LearningContext::default(),
            question_sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the mutation timestamp.
    pub fn touch(&mut self) {
        self.updated_at = crate::epoch_millis();
    }

    /// Knowledge points currently selected for question generation.
    pub fn selected_knowledge(&self) -> Vec<&KnowledgePoint> {
        self.knowledge_points.iter().filter(|kp| kp.selected).collect()
    }
}
