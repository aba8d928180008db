//! Cross-batch learning context
//!
//! An LLM has no memory between calls, so the pipeline carries one of these
//! per document: where we are in the hierarchy, what was recently extracted,
//! and what is still unresolved (a truncated fragment, exercises without
//! answers, answers without exercises).

use crate::knowledge::KnowledgeSummary;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum depth kept in `current_path` (oldest segments trimmed first).
pub const MAX_PATH_DEPTH: usize = 5;
/// Maximum entries kept in `recent_knowledge`.
pub const MAX_RECENT_KNOWLEDGE: usize = 15;
/// Capacity of the exercises-awaiting-answer queue.
pub const MAX_PENDING_EXERCISES: usize = 50;
/// Capacity of the answers-awaiting-question queue.
pub const MAX_PENDING_ANSWERS: usize = 50;

/// Fixed-capacity FIFO queue. Pushing at capacity evicts the oldest entry.
///
/// Serialized as a plain sequence; on load, only the newest `CAP` entries
/// survive.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedQueue<T, const CAP: usize> {
    items: VecDeque<T>,
}

impl<T, const CAP: usize> BoundedQueue<T, CAP> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Push to the back, evicting the front when at capacity.
    pub fn push(&mut self, item: T) {
        if self.items.len() >= CAP {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Remove and return the entry at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.items.remove(index)
    }

    /// Position of the first entry matching the predicate.
    pub fn position<F: FnMut(&T) -> bool>(&self, pred: F) -> Option<usize> {
        self.items.iter().position(pred)
    }

    /// Iterate front (oldest) to back (newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no entries are queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T, const CAP: usize> Default for BoundedQueue<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const CAP: usize> FromIterator<T> for BoundedQueue<T, CAP> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::new();
        for item in iter {
            queue.push(item);
        }
        queue
    }
}

impl<T: Serialize, const CAP: usize> Serialize for BoundedQueue<T, CAP> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>, const CAP: usize> Deserialize<'de> for BoundedQueue<T, CAP> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

/// An extracted exercise whose answer has not been seen yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingExercise {
    /// Id of the exercise knowledge point
    pub id: String,
    /// Its question number
    pub question_number: String,
    /// Its short title
    pub title: String,
}

/// A reported answer whose exercise has not been extracted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAnswer {
    /// Question number as reported by the model
    pub question_number: String,
    /// Answer content
    pub answer: String,
}

/// Unresolved carry-over between batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingState {
    /// Trailing incomplete content at a chunk boundary, prepended to the
    /// next chunk by the model
    #[serde(default)]
    pub fragment: Option<String>,
    /// Exercises waiting for their answers to appear
    #[serde(default)]
    pub exercises_awaiting_answer: BoundedQueue<PendingExercise, MAX_PENDING_EXERCISES>,
    /// Answers that arrived before their exercises
    #[serde(default)]
    pub answers_awaiting_question: BoundedQueue<PendingAnswer, MAX_PENDING_ANSWERS>,
}

/// Document archetype, detected once per document and then sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Exercise collections, tests, homework
    Exercises,
    /// Textbooks with theorems and definitions
    Textbook,
    /// Academic papers
    Paper,
    /// Everything else
    General,
}

impl DocumentType {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Exercises => "exercises",
            DocumentType::Textbook => "textbook",
            DocumentType::Paper => "paper",
            DocumentType::General => "general",
        }
    }
}

/// Region of the document the model believes it is reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    /// Table of contents
    Toc,
    /// Body content
    Content,
    /// Exercise section
    Exercises,
    /// Answer key section
    Answers,
    /// Appendix
    Appendix,
}

impl RegionType {
    /// Parse a model-reported region; unknown values yield `None`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "toc" => Some(RegionType::Toc),
            "content" => Some(RegionType::Content),
            "exercises" => Some(RegionType::Exercises),
            "answers" => Some(RegionType::Answers),
            "appendix" => Some(RegionType::Appendix),
            _ => None,
        }
    }
}

/// Memory carried between extraction batches for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningContext {
    /// Current position in the knowledge hierarchy (e.g. chapter > section)
    #[serde(default)]
    pub current_path: Vec<String>,
    /// Summaries of recently extracted knowledge points
    #[serde(default)]
    pub recent_knowledge: Vec<KnowledgeSummary>,
    /// Unresolved carry-over
    #[serde(default)]
    pub pending: PendingState,
    /// Sticky document archetype, set at first detection
    #[serde(default)]
    pub document_type: Option<DocumentType>,
    /// Last region reported by the model
    #[serde(default)]
    pub current_region: Option<RegionType>,
}

impl LearningContext {
    /// Copy of this context with the pending fragment cleared.
    ///
    /// Only the first worker of a batch consumes the fragment; the others
    /// get this copy so the fragment is not prepended twice.
    pub fn without_fragment(&self) -> Self {
        let mut ctx = self.clone();
        ctx.pending.fragment = None;
        ctx
    }
}
