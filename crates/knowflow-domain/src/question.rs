//! Generated practice questions

use serde::{Deserialize, Serialize};

/// Kind of practice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Single choice with four options
    Choice,
    /// Fill in the blank
    Fill,
    /// Calculation with full working
    Calculation,
    /// Short answer
    ShortAnswer,
    /// Proof or derivation
    Proof,
}

impl QuestionType {
    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Choice => "choice",
            QuestionType::Fill => "fill",
            QuestionType::Calculation => "calculation",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Proof => "proof",
        }
    }
}

/// Question difficulty, serialized as 1 / 2 / 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Difficulty {
    /// Straightforward recall or single-step application
    Easy,
    /// Requires combining ideas
    Medium,
    /// Multi-step or proof-level
    Hard,
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> u8 {
        match d {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Medium),
            3 => Ok(Difficulty::Hard),
            other => Err(format!("difficulty {} out of range [1, 3]", other)),
        }
    }
}

/// One generated practice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier
    pub id: String,
    /// Kind
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Question text
    pub content: String,
    /// Options for choice questions (exactly four when present)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Reference answer
    pub answer: String,
    /// Optional worked analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    /// Ids of the knowledge points this question was generated from
    #[serde(default)]
    pub source_knowledge_ids: Vec<String>,
    /// Difficulty
    pub difficulty: Difficulty,
    /// User favorite flag
    #[serde(default)]
    pub is_favorite: bool,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
}

/// One generation run: the questions produced from a knowledge selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSession {
    /// Unique identifier
    pub id: String,
    /// Generated questions
    pub questions: Vec<Question>,
    /// The knowledge point ids that were selected for this run
    pub selected_knowledge_ids: Vec<String>,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
}

impl QuestionSession {
    /// Create a session wrapping freshly generated questions.
    pub fn new(questions: Vec<Question>, selected_knowledge_ids: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            questions,
            selected_knowledge_ids,
            created_at: crate::epoch_millis(),
        }
    }
}
