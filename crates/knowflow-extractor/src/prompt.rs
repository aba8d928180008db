//! Extraction prompt composition
//!
//! Builds the instruction sent to the LLM for one unit: the response schema,
//! archetype-specific extraction rules, and - when the learning context has
//! anything to say - the current path, recent knowledge, the verbatim
//! pending fragment, and the exercises still awaiting answers.

use knowflow_domain::{DocumentType, LearningContext};

/// System prompt paired with every extraction request.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a knowledge extraction expert. \
Output strict JSON only - no markdown code fences, no surrounding text.";

/// How many recent knowledge titles the context block carries.
const RECENT_TITLES_IN_PROMPT: usize = 5;

/// Builds extraction instructions for one unit.
pub struct PromptBuilder<'a> {
    target_count: usize,
    archetype: DocumentType,
    context: Option<&'a LearningContext>,
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder for `target_count` knowledge points under `archetype` rules.
    pub fn new(target_count: usize, archetype: DocumentType) -> Self {
        Self {
            target_count,
            archetype,
            context: None,
        }
    }

    /// Attach the learning context carried from previous batches.
    pub fn with_context(mut self, context: &'a LearningContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Build the complete instruction text.
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. Archetype header and extraction principle
        prompt.push_str(self.archetype_rules());
        prompt.push('\n');

        // 2. Carried context, when there is any
        let context_block = self.context_block();
        if !context_block.is_empty() {
            prompt.push_str(&context_block);
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            "Extract at most {} knowledge points from the text.\n",
            self.target_count
        ));

        // 3. Response schema
        prompt.push_str(OUTPUT_FORMAT);
        prompt.push('\n');

        // 4. Field meanings and filtering rules
        prompt.push_str(COMMON_RULES);

        prompt
    }

    fn archetype_rules(&self) -> &'static str {
        match self.archetype {
            DocumentType::Exercises => EXERCISES_RULES,
            DocumentType::Textbook => TEXTBOOK_RULES,
            DocumentType::Paper => PAPER_RULES,
            DocumentType::General => GENERAL_RULES,
        }
    }

    fn context_block(&self) -> String {
        let Some(context) = self.context else {
            return String::new();
        };
        let mut parts: Vec<String> = Vec::new();

        if !context.current_path.is_empty() {
            parts.push(format!(
                "Current position: {}",
                context.current_path.join(" > ")
            ));
        }

        if !context.recent_knowledge.is_empty() {
            let start = context
                .recent_knowledge
                .len()
                .saturating_sub(RECENT_TITLES_IN_PROMPT);
            let recent: Vec<String> = context.recent_knowledge[start..]
                .iter()
                .map(|k| format!("[{}] {}", k.kind.as_str(), k.title))
                .collect();
            parts.push(format!("Recently extracted: {}", recent.join(", ")));
        }

        if let Some(fragment) = &context.pending.fragment {
            parts.push(format!(
                "[Important] The previous unit ended with unfinished content; handle it first:\n\"{}\"",
                fragment
            ));
        }

        if !context.pending.exercises_awaiting_answer.is_empty() {
            let awaiting: Vec<String> = context
                .pending
                .exercises_awaiting_answer
                .iter()
                .map(|e| format!("#{}: {}", e.question_number, e.title))
                .collect();
            parts.push(format!(
                "Exercises currently awaiting answers: {}",
                awaiting.join(", ")
            ));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("\n[Learning context]\n{}\n", parts.join("\n"))
        }
    }
}

const OUTPUT_FORMAT: &str = r#"
The output must be strict JSON (no markdown code fences), shaped as:
{
  "knowledgePoints": [
    {
      "id": "1",
      "title": "short title (under 20 words, shown in the tree)",
      "content": "complete content (question + options + answer, or theorem + proof)",
      "type": "exercise|concept|theorem|example|other",
      "level": 0,
      "parentId": null,
      "children": ["2"],
      "hasAnswer": true,
      "answer": "answer content (exercises whose answer appears here)",
      "questionNumber": "1.1 (question number, used for later answer matching)"
    }
  ],
  "pathChange": "name of a newly entered chapter/section, or null",
  "fragment": "incomplete trailing content of this unit (e.g. half a question); it will be prepended next time",
  "matchedAnswers": [
    {"questionNumber": "1.1", "answer": "the matched answer"}
  ],
  "regionType": "content|exercises|answers|toc|appendix"
}"#;

const COMMON_RULES: &str = r#"
Field rules:
- title: short, for table-of-contents display
- content: complete, preserving the source wording; formulas in LaTeX ($..$ or $$..$$)
- type: concept = definition, theorem = theorem/formula, example = worked example, exercise = exercise, other = anything else
- level: hierarchy depth starting at 0
- hasAnswer: false when an exercise has no answer yet
- answer: filled when an exercise's answer appears in the current content
- questionNumber: the exercise's number (e.g. "1", "2.3"), used to match answers later
- fragment: content cut off at the end of this unit (e.g. a truncated question)
- matchedAnswers: when this unit is an answer key, pair the numbers you find with their answers

Important:
- Never invent or complete content that is not present
- If the text supports fewer entries than requested, output only what is actually there
- Filter out page headers/footers, page numbers, figure captions, tables of contents, and copyright notices
- If the context carries an unfinished fragment, join it with the start of this unit before extracting"#;

const EXERCISES_RULES: &str = r#"The current document is an exercise collection.

[Core principle] One complete exercise = one knowledge point. Never split a single exercise into several knowledge points.

Recognition rules:
- Recognize numbering marks: 1. 2. 3. or (1) (2) (3) or 一、二、三、
- A knowledge point must contain the full stem, every option (for choice questions), and the answer when present
- An answer or analysis immediately following its question belongs to the same knowledge point
- Sub-questions of one larger question stay together as one knowledge point
- If a question is cut off at the end of this unit, put it in the fragment field
- If this unit is an answer area (answers without questions), extract the numbers into matchedAnswers"#;

const TEXTBOOK_RULES: &str = r#"The current document is a textbook.

[Core principle] One theorem/definition/concept/formula = one knowledge point. Keep each unit of knowledge whole.

Recognition rules:
- Theorem (type=theorem): statement plus its complete proof when present
- Definition/concept (type=concept): the definition plus its explanation
- Worked example (type=example): the problem plus its solution
- Exercise (type=exercise): the question content, with its number; the answer may come later

Level rules:
- level 0: chapter headings, core theorems
- level 1: important concepts, corollaries
- level 2: details and examples"#;

const PAPER_RULES: &str = r#"The current document is an academic paper.

[Core principle] One core claim/method/conclusion = one knowledge point.

Recognition rules:
- Research question (type=concept): the central problem the paper addresses
- Method contribution (type=theorem): a proposed method or improvement
- Experimental finding (type=other): key results and observations

Filtering:
- Skip author information, acknowledgements, and the reference list
- Keep the abstract, method descriptions, experiment design, and conclusions"#;

const GENERAL_RULES: &str = r#"[Core principle] A knowledge point is one complete, independently understandable unit of knowledge.
- A knowledge point is not "every sentence"
- A knowledge point is not "every paragraph"
- It may span several sentences or paragraphs

Recognition rules:
- An exercise (type=exercise): full question + options + answer = one knowledge point
- A theorem (type=theorem): statement + proof = one knowledge point
- A concept (type=concept): definition + explanation + example = one knowledge point
- A procedure (type=other): the complete step sequence = one knowledge point"#;

#[cfg(test)]
mod tests {
    use super::*;
    use knowflow_domain::{KnowledgeSummary, KnowledgeType, PendingExercise};

    #[test]
    fn test_prompt_includes_schema_fields() {
        let prompt = PromptBuilder::new(10, DocumentType::General).build();
        for field in [
            "knowledgePoints",
            "pathChange",
            "fragment",
            "matchedAnswers",
            "regionType",
            "hasAnswer",
            "questionNumber",
        ] {
            assert!(prompt.contains(field), "schema field {} missing", field);
        }
    }

    #[test]
    fn test_prompt_includes_target_count() {
        let prompt = PromptBuilder::new(7, DocumentType::General).build();
        assert!(prompt.contains("at most 7"));
    }

    #[test]
    fn test_archetype_rules_differ() {
        let exercises = PromptBuilder::new(10, DocumentType::Exercises).build();
        let textbook = PromptBuilder::new(10, DocumentType::Textbook).build();
        assert!(exercises.contains("One complete exercise = one knowledge point"));
        assert!(textbook.contains("One theorem/definition/concept/formula = one knowledge point"));
    }

    #[test]
    fn test_empty_context_adds_no_block() {
        let context = LearningContext::default();
        let prompt = PromptBuilder::new(10, DocumentType::General)
            .with_context(&context)
            .build();
        assert!(!prompt.contains("[Learning context]"));
    }

    #[test]
    fn test_context_block_contents() {
        let mut context = LearningContext::default();
        context.current_path = vec!["Chapter 1".to_string(), "Section 1.2".to_string()];
        context.pending.fragment = Some("the unfinished half".to_string());
        context.pending.exercises_awaiting_answer.push(PendingExercise {
            id: "b1_t0_1".to_string(),
            question_number: "3".to_string(),
            title: "limit exercise".to_string(),
        });
        for i in 0..8 {
            context.recent_knowledge.push(KnowledgeSummary {
                id: i.to_string(),
                title: format!("point {}", i),
                kind: KnowledgeType::Concept,
            });
        }

        let prompt = PromptBuilder::new(10, DocumentType::Exercises)
            .with_context(&context)
            .build();
        assert!(prompt.contains("Chapter 1 > Section 1.2"));
        assert!(prompt.contains("the unfinished half"));
        assert!(prompt.contains("#3: limit exercise"));
        // Only the last five recent titles appear
        assert!(prompt.contains("point 7"));
        assert!(prompt.contains("point 3"));
        assert!(!prompt.contains("point 2"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = PromptBuilder::new(10, DocumentType::Paper).build();
        let b = PromptBuilder::new(10, DocumentType::Paper).build();
        assert_eq!(a, b);
    }
}
