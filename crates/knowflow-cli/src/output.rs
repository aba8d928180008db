//! Terminal output formatting

use colored::Colorize;
use knowflow_domain::{Document, DocumentStatus, Question};
use knowflow_extractor::BatchReport;

/// One-line progress bar segment, e.g. `[####......]`.
fn progress_bar(cursor: u64, total: u64) -> String {
    const WIDTH: u64 = 20;
    if total == 0 {
        return format!("[{}]", " ".repeat(WIDTH as usize));
    }
    let filled = (cursor * WIDTH / total) as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(WIDTH as usize - filled))
}

fn status_label(status: DocumentStatus) -> colored::ColoredString {
    match status {
        DocumentStatus::Pending => "pending".yellow(),
        DocumentStatus::Processing => "processing".blue(),
        DocumentStatus::Done => "done".green(),
    }
}

/// Print a document summary block.
pub fn print_document(document: &Document) {
    println!("{} {}", "Document:".bold(), document.name);
    println!(
        "  status: {}   progress: {} {}/{} units",
        status_label(document.status),
        progress_bar(document.content_cursor, document.content_total),
        document.content_cursor,
        document.content_total
    );
    println!(
        "  knowledge points: {}   batches: {}   question sessions: {}",
        document.knowledge_points.len(),
        document.batch_index,
        document.question_sessions.len()
    );

    for kp in &document.knowledge_points {
        let indent = "  ".repeat(kp.level as usize + 1);
        let marker = if kp.selected { "*" } else { "-" };
        println!("{}{} [{}] {}", indent, marker, kp.kind.as_str(), kp.title);
    }
}

/// Print the outcome of one batch.
pub fn print_report(report: &BatchReport) {
    println!(
        "{} produced {} knowledge points, matched {} answers (cursor {}{})",
        "Batch committed:".bold(),
        report.produced,
        report.matched_answers,
        report.final_offset,
        if report.done { ", document complete" } else { "" }
    );
    if report.parse_failures > 0 {
        println!(
            "  {} {} worker response(s) were unparseable and yielded nothing",
            "note:".yellow(),
            report.parse_failures
        );
    }
}

/// Print one generated question.
pub fn print_question(index: usize, question: &Question) {
    println!(
        "{} [{}] {}",
        format!("{}.", index + 1).bold(),
        question.kind.as_str(),
        question.content
    );
    if let Some(options) = &question.options {
        for option in options {
            println!("     {}", option);
        }
    }
    println!("     {} {}", "answer:".green(), question.answer);
    if let Some(analysis) = &question.analysis {
        println!("     {} {}", "analysis:".dimmed(), analysis);
    }
}
