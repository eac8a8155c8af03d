//! Evaluation task records.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// One evaluation task: a question put to several candidate models.
///
/// Optional fields fall back to the run-level [`crate::RunConfig`]. The
/// legacy key names accepted as aliases (`text`, `model`, `file_path`,
/// `use_rag`, `rag_files`, ...) let older task files load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Question asked of every candidate model
    #[serde(alias = "text")]
    pub question: String,

    /// Candidate models, in configured order
    #[serde(alias = "model", deserialize_with = "one_or_many")]
    pub candidate_models: Vec<String>,

    /// Model used to score the answers
    #[serde(default)]
    pub evaluator_model: Option<String>,

    /// File the rendered report is appended to
    #[serde(alias = "file_path")]
    pub report_path: PathBuf,

    /// Register `source_files` and augment prompts with retrieved context
    #[serde(default, alias = "use_rag")]
    pub use_retrieval: bool,

    /// Retrieval service base URL
    #[serde(default, alias = "rag_server_url")]
    pub retrieval_endpoint: Option<String>,

    /// Documents registered with the retrieval service
    #[serde(default, alias = "rag_files", deserialize_with = "one_or_many_paths")]
    pub source_files: Vec<PathBuf>,

    /// Augmented prompt template (`{context}`, `{question}`)
    #[serde(default, alias = "rag_prompt")]
    pub prompt_template: Option<String>,

    /// Evaluator prompt template (`{question}`, `{answer}`, `{latency}`)
    #[serde(default, alias = "evaluation_prompt")]
    pub evaluation_template: Option<String>,

    /// Inference backend base URL
    #[serde(default, alias = "ollama_server_url", alias = "Ollama_server_url")]
    pub backend_endpoint: Option<String>,
}

impl Task {
    /// Create a task with no overrides.
    pub fn new(
        question: impl Into<String>,
        candidate_models: Vec<String>,
        report_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            question: question.into(),
            candidate_models,
            evaluator_model: None,
            report_path: report_path.into(),
            use_retrieval: false,
            retrieval_endpoint: None,
            source_files: Vec::new(),
            prompt_template: None,
            evaluation_template: None,
            backend_endpoint: None,
        }
    }

    /// Enable retrieval over the given documents.
    pub fn with_retrieval(mut self, files: Vec<PathBuf>) -> Self {
        self.use_retrieval = true;
        self.source_files = files;
        self
    }

    pub fn with_evaluator(mut self, model: impl Into<String>) -> Self {
        self.evaluator_model = Some(model.into());
        self
    }

    pub fn with_backend_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.backend_endpoint = Some(endpoint.into());
        self
    }

    /// Whether retrieval registration should run for this task.
    pub fn wants_registration(&self) -> bool {
        self.use_retrieval && !self.source_files.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        };
        items
            .into_iter()
            .filter(|item| !item.trim().is_empty())
            .collect()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(OneOrMany::deserialize(deserializer)?.into_vec())
}

fn one_or_many_paths<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(one_or_many(deserializer)?
        .into_iter()
        .map(PathBuf::from)
        .collect())
}
