//! Candidate answers and their latency.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Prefix carried by the rendered text of a failed generation.
pub const ERROR_MARKER_PREFIX: &str = "[ERROR:";

/// Why a candidate answer could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationFailure {
    #[error("model '{model}' is missing or could not be downloaded")]
    ModelUnavailable { model: String },

    #[error("{0}")]
    Backend(String),
}

/// How the prompt sent to the backend was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// The bare question.
    Plain,
    /// Retrieved context interpolated into the augmented template.
    Augmented,
}

impl PromptMode {
    pub fn label(&self) -> &'static str {
        match self {
            PromptMode::Plain => "plain",
            PromptMode::Augmented => "RAG",
        }
    }
}

/// One candidate model's answer to a task question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub model: String,
    pub answer: Result<String, GenerationFailure>,
    pub latency: Duration,
    pub mode: PromptMode,
}

impl GenerationResult {
    pub fn success(
        model: impl Into<String>,
        answer: impl Into<String>,
        latency: Duration,
        mode: PromptMode,
    ) -> Self {
        Self {
            model: model.into(),
            answer: Ok(answer.into()),
            latency,
            mode,
        }
    }

    pub fn failure(
        model: impl Into<String>,
        failure: GenerationFailure,
        latency: Duration,
        mode: PromptMode,
    ) -> Self {
        Self {
            model: model.into(),
            answer: Err(failure),
            latency,
            mode,
        }
    }

    /// Precondition failure: the model was never asked, so no time is charged.
    pub fn model_unavailable(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            answer: Err(GenerationFailure::ModelUnavailable {
                model: model.clone(),
            }),
            model,
            latency: Duration::ZERO,
            mode: PromptMode::Plain,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.answer.is_ok()
    }

    pub fn latency_seconds(&self) -> f64 {
        self.latency.as_secs_f64()
    }

    /// Answer text, or `[ERROR: <reason>]` for failures.
    pub fn answer_text(&self) -> String {
        match &self.answer {
            Ok(text) => text.clone(),
            Err(failure) => format!("{ERROR_MARKER_PREFIX} {failure}]"),
        }
    }

    /// Report label: the model name followed by the prompt mode.
    pub fn label(&self) -> String {
        format!("{} [{}]", self.model, self.mode.label())
    }
}
