//! Practice-question generation
//!
//! Generates questions from a selection of knowledge points, one model call
//! per question type, with validation and a bounded retry per type. A type
//! that keeps failing is recorded as an issue; the run still yields whatever
//! the other types produced.

use crate::error::ExtractorError;
use crate::parser::parse_model_json;
use knowflow_domain::traits::ChatProvider;
use knowflow_domain::{Difficulty, KnowledgePoint, Question, QuestionType};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Retries per question type after the first failed attempt.
const MAX_GENERATION_RETRIES: usize = 2;

/// Options required on a choice question.
const CHOICE_OPTION_COUNT: usize = 4;

const QUESTION_SYSTEM_PROMPT: &str = "You are a professional question writer. \
Output strict JSON only - no markdown code fences, no surrounding text. Every \
question must have complete content and answer fields; choice questions must \
have exactly four options labelled A-D.";

/// A generation request over selected knowledge points.
#[derive(Debug, Clone)]
pub struct QuestionRequest<'a> {
    /// Knowledge points to generate from (the user's selection)
    pub knowledge_points: &'a [KnowledgePoint],
    /// Question types to produce
    pub types: Vec<QuestionType>,
    /// Questions requested per type
    pub count_per_type: usize,
    /// Difficulty of the generated questions
    pub difficulty: Difficulty,
}

/// A type that produced nothing usable, with the last failure seen.
#[derive(Debug, Clone)]
pub struct GenerationIssue {
    /// The failing question type
    pub kind: QuestionType,
    /// Last error message
    pub message: String,
    /// Whether any retry was attempted
    pub retried: bool,
}

/// Result of one generation run. A partial yield is not an error.
#[derive(Debug, Clone)]
pub struct QuestionYield {
    /// Questions that passed validation
    pub questions: Vec<Question>,
    /// Types that failed entirely
    pub issues: Vec<GenerationIssue>,
    /// Total questions requested across all types
    pub total_requested: usize,
}

/// Generates practice questions through the chat collaborator.
pub struct QuestionGenerator<P> {
    provider: Arc<P>,
}

impl<P: ChatProvider> QuestionGenerator<P> {
    /// Create a generator over `provider`.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Generate questions for every requested type.
    pub async fn generate(
        &self,
        request: QuestionRequest<'_>,
    ) -> Result<QuestionYield, ExtractorError> {
        if request.knowledge_points.is_empty() {
            return Err(ExtractorError::Config(
                "no knowledge points selected".to_string(),
            ));
        }

        let contents: String = request
            .knowledge_points
            .iter()
            .enumerate()
            .map(|(i, kp)| format!("{}. {}", i + 1, kp.content))
            .collect::<Vec<_>>()
            .join("\n");
        let source_ids: Vec<String> = request
            .knowledge_points
            .iter()
            .map(|kp| kp.id.clone())
            .collect();

        let mut questions = Vec::new();
        let mut issues = Vec::new();
        let mut total_requested = 0;

        for kind in &request.types {
            total_requested += request.count_per_type;
            let prompt =
                build_question_prompt(*kind, &contents, request.count_per_type, request.difficulty);

            let mut accepted: Vec<Question> = Vec::new();
            let mut last_error = String::new();
            let mut retried = false;

            for attempt in 0..=MAX_GENERATION_RETRIES {
                if attempt > 0 {
                    retried = true;
                }

                let raw = match self
                    .provider
                    .chat(Some(QUESTION_SYSTEM_PROMPT), &prompt)
                    .await
                {
                    Ok(raw) => raw,
                    Err(e) => {
                        last_error = e.to_string();
                        continue;
                    }
                };

                let parsed = match parse_model_json(&raw) {
                    Ok(parsed) => parsed,
                    Err(failure) => {
                        last_error = failure.reason;
                        continue;
                    }
                };

                let valid = questions_from(&parsed.value, *kind, &source_ids, request.difficulty);
                if valid.is_empty() {
                    last_error = "no valid questions in response".to_string();
                    continue;
                }

                debug!(kind = kind.as_str(), count = valid.len(), attempt, "questions generated");
                accepted = valid;
                break;
            }

            if accepted.is_empty() {
                warn!(kind = kind.as_str(), error = %last_error, "question type yielded nothing");
                issues.push(GenerationIssue {
                    kind: *kind,
                    message: last_error,
                    retried,
                });
            }
            questions.extend(accepted);
        }

        Ok(QuestionYield {
            questions,
            issues,
            total_requested,
        })
    }
}

fn type_brief(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::Choice => {
            "single-choice questions with exactly four options (A/B/C/D); the answer names the correct letter"
        }
        QuestionType::Fill => {
            "fill-in-the-blank questions marking each blank with ____; the answer gives the full missing content"
        }
        QuestionType::Calculation => {
            "calculation questions requiring concrete working; the answer contains the complete solution steps"
        }
        QuestionType::ShortAnswer => {
            "short-answer questions asking for a brief explanation of a concept or principle"
        }
        QuestionType::Proof => {
            "proof questions requiring rigorous logical derivation"
        }
    }
}

fn build_question_prompt(
    kind: QuestionType,
    contents: &str,
    count: usize,
    difficulty: Difficulty,
) -> String {
    format!(
        r#"Based on the knowledge points below, write {count} {brief}.
Difficulty level: {difficulty} of 3.

Knowledge points:
{contents}

The output must be strict JSON shaped as:
{{
  "questions": [
    {{
      "content": "the question text",
      "options": ["A. ...", "B. ...", "C. ...", "D. ..."],
      "answer": "the reference answer",
      "analysis": "a short explanation"
    }}
  ]
}}
Omit "options" for non-choice questions. Questions must be answerable from
the knowledge points alone; do not invent outside facts."#,
        count = count,
        brief = type_brief(kind),
        difficulty = u8::from(difficulty),
        contents = contents,
    )
}

/// Validate and convert the model's question list. Individual malformed
/// entries are dropped; a choice question without exactly four options is
/// malformed.
fn questions_from(
    value: &Value,
    kind: QuestionType,
    source_ids: &[String],
    difficulty: Difficulty,
) -> Vec<Question> {
    let list = match value.get("questions").and_then(Value::as_array) {
        Some(list) => list,
        None => match value.as_array() {
            Some(list) => list,
            None => return Vec::new(),
        },
    };
    let now = knowflow_domain::epoch_millis();

    list.iter()
        .filter_map(|item| {
            let content = item.get("content")?.as_str()?.trim().to_string();
            let answer = item.get("answer")?.as_str()?.trim().to_string();
            if content.is_empty() || answer.is_empty() {
                return None;
            }

            let options = item.get("options").and_then(Value::as_array).map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            });
            if kind == QuestionType::Choice
                && options.as_ref().map(Vec::len) != Some(CHOICE_OPTION_COUNT)
            {
                return None;
            }

            Some(Question {
                id: uuid::Uuid::now_v7().to_string(),
                kind,
                content,
                options,
                answer,
                analysis: item
                    .get("analysis")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                source_knowledge_ids: source_ids.to_vec(),
                difficulty,
                is_favorite: false,
                created_at: now,
            })
        })
        .collect()
}
