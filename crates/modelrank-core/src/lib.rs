//! # modelrank-core
//!
//! Deterministic building blocks for ranking LLM answers.
//!
//! This crate never performs I/O against a model backend. It provides:
//! - The task and run-configuration data model
//! - Prompt template interpolation
//! - Extraction of `<SCORE>`/`<SUMMARY>` markers from evaluator output
//! - Ranking and report rendering
//!
//! ## Example
//!
//! ```rust
//! use modelrank_core::{parse_evaluation_output, rank, RankedEntry, GenerationResult, PromptMode};
//! use std::time::Duration;
//!
//! let evaluation = parse_evaluation_output("<SCORE>87</SCORE><SUMMARY>Good.</SUMMARY>");
//! assert_eq!(evaluation.score, 87);
//!
//! let answer = GenerationResult::success("llama3.1:8b", "Iron and nickel.", Duration::from_secs(2), PromptMode::Plain);
//! let report = rank("What is the core made of?", "gemma2:9b", vec![RankedEntry::new(answer, evaluation)]);
//! assert!(report.render().contains("**Score: 87**"));
//! ```

pub mod config;
pub mod evaluation;
pub mod generation;
pub mod prompts;
pub mod report;
pub mod task;
pub mod template;

// Re-export main types at crate root
pub use config::{
    ConfigError, ProbeSettings, ResolvedTask, RetrievalTimeouts, RunConfig, RunFile,
    DEFAULT_BACKEND_ENDPOINT, DEFAULT_EVALUATOR_MODEL, DEFAULT_RETRIEVAL_ENDPOINT,
};
pub use evaluation::{parse_evaluation_output, EvaluationResult};
pub use generation::{GenerationFailure, GenerationResult, PromptMode, ERROR_MARKER_PREFIX};
pub use report::{rank, report_block, RankedEntry, RankedReport};
pub use task::Task;
pub use template::{render_augmented_prompt, render_evaluation_prompt};
