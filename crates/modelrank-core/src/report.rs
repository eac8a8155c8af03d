//! Ranking and report rendering.
//!
//! Results are stable-sorted by score (descending), so candidates with equal
//! scores keep their configured order. The rendered report has two parts: a
//! numbered summary and a full detail section in the same order.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::evaluation::EvaluationResult;
use crate::generation::GenerationResult;

/// Characters of the answer shown in the summary section.
pub const EXCERPT_CHARS: usize = 100;

/// Width of the `=` line closing each persisted report block.
pub const SEPARATOR_WIDTH: usize = 80;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DETAIL_RULE: &str = "--------------------------------------";

/// One row of a ranking: a labelled generation and its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub label: String,
    pub generation: GenerationResult,
    pub evaluation: EvaluationResult,
}

impl RankedEntry {
    pub fn new(generation: GenerationResult, evaluation: EvaluationResult) -> Self {
        Self {
            label: generation.label(),
            generation,
            evaluation,
        }
    }

    pub fn score(&self) -> u8 {
        self.evaluation.score
    }
}

/// Results for one task, ordered best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedReport {
    pub question: String,
    pub evaluator: String,
    entries: Vec<RankedEntry>,
}

impl RankedReport {
    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render with the current local time.
    pub fn render(&self) -> String {
        self.render_at(Local::now().naive_local())
    }

    /// Render with an explicit timestamp.
    pub fn render_at(&self, timestamp: NaiveDateTime) -> String {
        let mut out = format!(
            "--- Model Evaluation Results ({}) ---\n",
            timestamp.format(TIMESTAMP_FORMAT)
        );
        out.push_str(&format!("[Question]: {}\n", self.question));
        out.push_str(&format!("[Evaluator model]: {}\n\n", self.evaluator));
        out.push_str("[Ranking]:\n");

        for (rank, entry) in self.entries.iter().enumerate() {
            let answer = entry.generation.answer_text();
            out.push_str(&format!(
                "  {}. Model: {} - **Score: {}** (generation time: {:.2}s)\n",
                rank + 1,
                entry.label,
                entry.score(),
                entry.generation.latency_seconds()
            ));
            out.push_str(&format!("     [Summary]: {}\n", entry.evaluation.summary));
            out.push_str(&format!(
                "     [Answer excerpt]: {}...\n\n",
                excerpt(&answer, EXCERPT_CHARS)
            ));
        }

        out.push_str("--- Details ---\n");
        for entry in &self.entries {
            out.push_str(&format!("Model: {}\n", entry.label));
            out.push_str(&format!("Score: {}\n", entry.score()));
            out.push_str(&format!(
                "Generation time: {:.2}s\n",
                entry.generation.latency_seconds()
            ));
            out.push_str(&format!("Summary:\n{}\n", entry.evaluation.summary));
            out.push_str(&format!("Answer:\n{}\n", entry.generation.answer_text()));
            out.push_str(DETAIL_RULE);
            out.push('\n');
        }

        out
    }
}

/// Stable-sort `results` by score, highest first.
pub fn rank(
    question: impl Into<String>,
    evaluator: impl Into<String>,
    mut results: Vec<RankedEntry>,
) -> RankedReport {
    results.sort_by(|a, b| b.score().cmp(&a.score()));
    RankedReport {
        question: question.into(),
        evaluator: evaluator.into(),
        entries: results,
    }
}

/// Wrap rendered report text in the block appended to a report file:
/// the text, a blank line, an 80-character `=` separator, a blank line.
pub fn report_block(text: &str) -> String {
    format!("{text}\n\n{}\n\n", "=".repeat(SEPARATOR_WIDTH))
}

/// First `max_chars` characters of `text`, respecting char boundaries.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationFailure, PromptMode};
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::time::Duration;

    fn entry(model: &str, score: u8) -> RankedEntry {
        RankedEntry::new(
            GenerationResult::success(
                model,
                format!("answer from {model}"),
                Duration::from_millis(500),
                PromptMode::Plain,
            ),
            EvaluationResult::new(score, format!("summary for {model}")),
        )
    }

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_stable_tie_break() {
        let report = rank(
            "q",
            "judge",
            vec![entry("A", 40), entry("B", 90), entry("C", 90), entry("D", 10)],
        );
        let order: Vec<&str> = report
            .entries()
            .iter()
            .map(|e| e.generation.model.as_str())
            .collect();
        assert_eq!(order, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_render_sections_in_rank_order() {
        let report = rank(
            "What is the core made of?",
            "judge",
            vec![entry("A", 40), entry("B", 90)],
        );
        let text = report.render_at(fixed_time());

        assert!(text.starts_with("--- Model Evaluation Results (2026-10-14 09:30:00) ---\n"));
        assert!(text.contains("[Question]: What is the core made of?"));
        assert!(text.contains("[Evaluator model]: judge"));
        assert!(text.contains("  1. Model: B [plain] - **Score: 90** (generation time: 0.50s)"));
        assert!(text.contains("  2. Model: A [plain] - **Score: 40**"));

        let details = text.split("--- Details ---").nth(1).unwrap();
        let b = details.find("Model: B").unwrap();
        let a = details.find("Model: A").unwrap();
        assert!(b < a);
        assert_eq!(details.matches(DETAIL_RULE).count(), 2);
    }

    #[test]
    fn test_render_is_deterministic_for_fixed_time() {
        let report = rank("q", "judge", vec![entry("A", 1), entry("B", 2)]);
        assert_eq!(report.render_at(fixed_time()), report.render_at(fixed_time()));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "地".repeat(150);
        let cut = excerpt(&long, EXCERPT_CHARS);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS);
        assert_eq!(excerpt("short", EXCERPT_CHARS), "short");
    }

    #[test]
    fn test_failed_generation_rendered_with_marker() {
        let failed = RankedEntry::new(
            GenerationResult::failure(
                "X",
                GenerationFailure::Backend("boom".into()),
                Duration::from_millis(20),
                PromptMode::Plain,
            ),
            EvaluationResult::generation_failed(),
        );
        let text = rank("q", "judge", vec![failed]).render_at(fixed_time());
        assert!(text.contains("[ERROR: boom]"));
        assert!(text.contains(crate::evaluation::GENERATION_FAILED));
    }

    #[test]
    fn test_report_block_trailer() {
        let block = report_block("body");
        assert!(block.starts_with("body\n\n"));
        assert!(block.ends_with(&format!("{}\n\n", "=".repeat(80))));
    }

    proptest! {
        #[test]
        fn prop_rank_is_sorted_permutation(scores in proptest::collection::vec(0u8..=100, 0..12)) {
            let entries: Vec<RankedEntry> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| entry(&format!("m{i}"), *s))
                .collect();
            let report = rank("q", "judge", entries);

            prop_assert_eq!(report.len(), scores.len());
            for pair in report.entries().windows(2) {
                prop_assert!(pair[0].score() >= pair[1].score());
                if pair[0].score() == pair[1].score() {
                    let left: usize = pair[0].generation.model[1..].parse().unwrap();
                    let right: usize = pair[1].generation.model[1..].parse().unwrap();
                    prop_assert!(left < right);
                }
            }
        }
    }
}
