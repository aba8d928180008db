//! `knowflow questions` - generate practice questions.

use crate::commands::resolve_sidecar;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output;
use knowflow_domain::{Difficulty, QuestionSession, QuestionType};
use knowflow_llm::ChatClient;
use knowflow_extractor::{QuestionGenerator, QuestionRequest};
use knowflow_store::{load, save, SidecarFile};
use std::path::Path;
use std::sync::Arc;

fn parse_question_type(raw: &str) -> Result<QuestionType> {
    match raw {
        "choice" => Ok(QuestionType::Choice),
        "fill" => Ok(QuestionType::Fill),
        "calculation" => Ok(QuestionType::Calculation),
        "short_answer" => Ok(QuestionType::ShortAnswer),
        "proof" => Ok(QuestionType::Proof),
        other => Err(CliError::InvalidArgument(format!(
            "unknown question type '{}' (expected choice, fill, calculation, short_answer, proof)",
            other
        ))),
    }
}

pub async fn execute_questions(
    file: &Path,
    types: Vec<String>,
    count: Option<usize>,
    difficulty: Option<u8>,
    config: &CliConfig,
) -> Result<()> {
    if config.api.api_key.is_empty() {
        return Err(CliError::Config(
            "API key not configured; set [api].api_key in config.toml".to_string(),
        ));
    }

    let path = resolve_sidecar(file);
    let sidecar = load(&path)?;
    let source = sidecar.descriptor()?;
    let mut document = sidecar.app;

    // The user's selection, falling back to the whole tree.
    let mut selected: Vec<_> = document.selected_knowledge().into_iter().cloned().collect();
    if selected.is_empty() {
        selected = document.knowledge_points.clone();
    }
    if selected.is_empty() {
        return Err(CliError::InvalidArgument(
            "document has no knowledge points yet; run `knowflow batch` first".to_string(),
        ));
    }

    let types: Vec<QuestionType> = if types.is_empty() {
        vec![QuestionType::Choice, QuestionType::ShortAnswer]
    } else {
        types
            .iter()
            .map(|t| parse_question_type(t))
            .collect::<Result<_>>()?
    };
    let difficulty = Difficulty::try_from(difficulty.unwrap_or(config.questions.difficulty))
        .map_err(CliError::InvalidArgument)?;
    let count_per_type = count.unwrap_or(config.questions.count_per_type);

    let provider = Arc::new(ChatClient::new(
        &config.api.base_url,
        &config.api.api_key,
        &config.api.text_model,
        &config.api.vision_model,
    )?);
    let generator = QuestionGenerator::new(provider);

    let yielded = generator
        .generate(QuestionRequest {
            knowledge_points: &selected,
            types,
            count_per_type,
            difficulty,
        })
        .await?;

    println!(
        "Generated {} of {} requested questions.",
        yielded.questions.len(),
        yielded.total_requested
    );
    for (index, question) in yielded.questions.iter().enumerate() {
        output::print_question(index, question);
    }
    for issue in &yielded.issues {
        println!(
            "Type '{}' failed{}: {}",
            issue.kind.as_str(),
            if issue.retried { " after retries" } else { "" },
            issue.message
        );
    }

    if !yielded.questions.is_empty() {
        let selected_ids = selected.iter().map(|kp| kp.id.clone()).collect();
        document
            .question_sessions
            .push(QuestionSession::new(yielded.questions, selected_ids));
        document.touch();
        let snapshot = SidecarFile::snapshot(&source, sidecar.original_file_type, document);
        save(&path, &snapshot)?;
    }
    Ok(())
}
