//! Evaluator output: scores, summaries and marker extraction.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Highest score an evaluator can award.
pub const MAX_SCORE: u8 = 100;

/// Summary used when the evaluator reply has no `<SUMMARY>` marker.
pub const SUMMARY_EXTRACTION_FAILED: &str = "Summary extraction failed.";

/// Summary used when the evaluator model cannot be made available.
pub const EVALUATOR_UNAVAILABLE: &str = "Evaluator model unavailable.";

/// Summary used for rows whose generation failed.
pub const GENERATION_FAILED: &str = "Generation failed; evaluation skipped.";

lazy_static! {
    static ref SCORE_PATTERN: Regex = Regex::new(r"<SCORE>(\d+)</SCORE>").unwrap();
    static ref SUMMARY_PATTERN: Regex = Regex::new(r"(?s)<SUMMARY>(.*?)</SUMMARY>").unwrap();
}

/// Score and summary for one generated answer.
///
/// A score of 0 means "unscored or failed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: u8,
    pub summary: String,
}

impl EvaluationResult {
    pub fn new(score: u8, summary: impl Into<String>) -> Self {
        Self {
            score: score.min(MAX_SCORE),
            summary: summary.into(),
        }
    }

    /// A zero-score result carrying a diagnostic summary.
    pub fn unscored(summary: impl Into<String>) -> Self {
        Self::new(0, summary)
    }

    pub fn evaluator_unavailable() -> Self {
        Self::unscored(EVALUATOR_UNAVAILABLE)
    }

    pub fn generation_failed() -> Self {
        Self::unscored(GENERATION_FAILED)
    }

    pub fn evaluator_error(error: impl std::fmt::Display) -> Self {
        Self::unscored(format!("Evaluator execution error: {error}"))
    }
}

/// Extract score and summary from free-form evaluator text.
///
/// The two markers are extracted independently: a missing score yields 0, a
/// missing summary yields [`SUMMARY_EXTRACTION_FAILED`]. Scores above
/// [`MAX_SCORE`] are clamped. Never fails.
pub fn parse_evaluation_output(text: &str) -> EvaluationResult {
    let score = SCORE_PATTERN
        .captures(text)
        .map(|caps| match caps[1].parse::<u64>() {
            Ok(value) => value.min(u64::from(MAX_SCORE)) as u8,
            // Only digits matched, so a parse failure is an overflow.
            Err(_) => MAX_SCORE,
        })
        .unwrap_or(0);

    let summary = SUMMARY_PATTERN
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| SUMMARY_EXTRACTION_FAILED.to_string());

    EvaluationResult { score, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_both_markers() {
        let result = parse_evaluation_output("<SCORE>87</SCORE><SUMMARY>Good.</SUMMARY>");
        assert_eq!(result, EvaluationResult::new(87, "Good."));
    }

    #[test]
    fn test_missing_score() {
        let result = parse_evaluation_output("<SUMMARY>Clear but slow.</SUMMARY>");
        assert_eq!(result.score, 0);
        assert_eq!(result.summary, "Clear but slow.");
    }

    #[test]
    fn test_missing_summary() {
        let result = parse_evaluation_output("Score: <SCORE>42</SCORE>");
        assert_eq!(result.score, 42);
        assert_eq!(result.summary, SUMMARY_EXTRACTION_FAILED);
    }

    #[test]
    fn test_multiline_summary_is_trimmed() {
        let text = "<SCORE>70</SCORE>\n<SUMMARY>\nLine one.\nLine two.\n</SUMMARY>";
        let result = parse_evaluation_output(text);
        assert_eq!(result.summary, "Line one.\nLine two.");
    }

    #[test]
    fn test_first_match_wins() {
        let text = "<SCORE>10</SCORE><SCORE>99</SCORE><SUMMARY>a</SUMMARY><SUMMARY>b</SUMMARY>";
        let result = parse_evaluation_output(text);
        assert_eq!(result.score, 10);
        assert_eq!(result.summary, "a");
    }

    #[test]
    fn test_non_numeric_score_ignored() {
        let result = parse_evaluation_output("<SCORE>high</SCORE>");
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_out_of_range_scores_clamp() {
        assert_eq!(parse_evaluation_output("<SCORE>250</SCORE>").score, 100);
        assert_eq!(
            parse_evaluation_output("<SCORE>99999999999999999999999999</SCORE>").score,
            100
        );
    }

    #[test]
    fn test_fixed_summaries() {
        assert_eq!(EvaluationResult::generation_failed().score, 0);
        assert_eq!(
            EvaluationResult::evaluator_unavailable().summary,
            EVALUATOR_UNAVAILABLE
        );
        assert!(EvaluationResult::evaluator_error("timeout")
            .summary
            .contains("timeout"));
    }

    proptest! {
        #[test]
        fn prop_parse_never_exceeds_max(text in ".*") {
            let result = parse_evaluation_output(&text);
            prop_assert!(result.score <= MAX_SCORE);
        }

        #[test]
        fn prop_score_roundtrip(score in 0u8..=100, summary in "[a-zA-Z .,]{1,40}") {
            let text = format!("noise <SCORE>{score}</SCORE> more <SUMMARY>{summary}</SUMMARY>");
            let result = parse_evaluation_output(&text);
            prop_assert_eq!(result.score, score);
            prop_assert_eq!(result.summary, summary.trim().to_string());
        }
    }
}
