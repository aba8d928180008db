//! `knowflow status` and `knowflow context` - inspection commands.

use crate::commands::resolve_sidecar;
use crate::error::Result;
use crate::output;
use knowflow_store::load;
use std::path::Path;

pub async fn execute_status(file: &Path) -> Result<()> {
    let sidecar = load(&resolve_sidecar(file))?;
    output::print_document(&sidecar.app);
    Ok(())
}

pub async fn execute_context(file: &Path) -> Result<()> {
    let sidecar = load(&resolve_sidecar(file))?;
    let context = &sidecar.app.learning_context;

    println!("Learning context for '{}':", sidecar.app.name);
    println!(
        "  document type: {}",
        context
            .document_type
            .map(|t| t.as_str())
            .unwrap_or("not detected yet")
    );
    println!(
        "  current path: {}",
        if context.current_path.is_empty() {
            "(root)".to_string()
        } else {
            context.current_path.join(" > ")
        }
    );

    if !context.recent_knowledge.is_empty() {
        println!("  recent knowledge:");
        for summary in &context.recent_knowledge {
            println!("    [{}] {}", summary.kind.as_str(), summary.title);
        }
    }

    match &context.pending.fragment {
        Some(fragment) => println!("  pending fragment: \"{}\"", fragment),
        None => println!("  pending fragment: none"),
    }

    if !context.pending.exercises_awaiting_answer.is_empty() {
        println!("  exercises awaiting answers:");
        for entry in context.pending.exercises_awaiting_answer.iter() {
            println!("    #{} {} ({})", entry.question_number, entry.title, entry.id);
        }
    }
    if !context.pending.answers_awaiting_question.is_empty() {
        println!("  answers awaiting their exercises:");
        for entry in context.pending.answers_awaiting_question.iter() {
            println!("    #{}", entry.question_number);
        }
    }
    Ok(())
}
