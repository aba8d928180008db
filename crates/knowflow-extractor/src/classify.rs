//! Document archetype classification
//!
//! Runs once per document on a text sample plus the file name; the result is
//! cached in the learning context and never re-detected. Each archetype has
//! an independent pattern family; an archetype is chosen only when at least
//! [`SCORE_THRESHOLD`] of its patterns hit, checked in priority order.

use knowflow_domain::DocumentType;
use regex::Regex;
use std::sync::LazyLock;

/// Independent pattern hits required before an archetype is selected.
pub const SCORE_THRESHOLD: usize = 3;

static FILENAME_EXERCISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)习题|练习|作业|试卷|考试|test|exam|exercise").unwrap()
});

static EXERCISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Numbered items: 1. 2、 3．
        r"(?m)^\s*[1-9]\d*[.、．]\s*",
        // Chinese-numeral items: 一、 二、
        r"(?m)^\s*[一二三四五六七八九十]+[.、．]\s*",
        // Parenthesized items: (1) （2）
        r"(?m)^\s*[(（][1-9]\d*[)）]",
        // Lettered items: A. b.
        r"(?m)^\s*[A-Za-z][.、．]\s*",
        r"选择题|填空题|计算题|简答题|证明题|判断题",
        r"答案[:：]|解[:：]|解答[:：]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TEXTBOOK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"定理\s*[\d.]+",
        r"引理\s*[\d.]+",
        r"推论\s*[\d.]+",
        r"定义\s*[\d.]+",
        r"公理\s*[\d.]+",
        r"第[一二三四五六七八九十\d]+章",
        r"证明[:：\s]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PAPER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)摘要|abstract",
        r"(?i)关键词|keywords",
        r"(?i)参考文献|references",
        r"(?i)结论|conclusion",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn score(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|p| p.is_match(text)).count()
}

/// Classify a document from a text sample and its file name.
///
/// File-name keywords meaning exercise/test/homework short-circuit to
/// [`DocumentType::Exercises`]. Ties between families are resolved by
/// checking exercises, then textbook, then paper; below threshold on all
/// three means [`DocumentType::General`].
pub fn classify(sample: &str, file_name: &str) -> DocumentType {
    if FILENAME_EXERCISE.is_match(file_name) {
        return DocumentType::Exercises;
    }

    if score(&EXERCISE_PATTERNS, sample) >= SCORE_THRESHOLD {
        return DocumentType::Exercises;
    }
    if score(&TEXTBOOK_PATTERNS, sample) >= SCORE_THRESHOLD {
        return DocumentType::Textbook;
    }
    if score(&PAPER_PATTERNS, sample) >= SCORE_THRESHOLD {
        return DocumentType::Paper;
    }

    DocumentType::General
}
