//! Run-level configuration and run files.
//!
//! Every overridable task field resolves in this order: the task's own
//! value, else the run file's `defaults`, else the built-in default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::prompts::{DEFAULT_AUGMENTED_TEMPLATE, DEFAULT_EVALUATION_TEMPLATE};
use crate::task::Task;

pub const DEFAULT_BACKEND_ENDPOINT: &str = "http://127.0.0.1:11434";
pub const DEFAULT_RETRIEVAL_ENDPOINT: &str = "http://127.0.0.1:8001";
pub const DEFAULT_EVALUATOR_MODEL: &str = "llama3.1:8b";

/// Errors that can occur when loading a run file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read run file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Task {index} is invalid: {reason}")]
    InvalidTask { index: usize, reason: String },
}

/// Readiness probe settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Probe attempts before giving up
    pub max_retries: usize,

    /// Delay after the first failed attempt; doubles after each failure
    #[serde(with = "duration_str")]
    pub initial_delay: Duration,

    /// Timeout of a single liveness request
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP timeouts for the retrieval service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalTimeouts {
    #[serde(with = "duration_str")]
    pub register: Duration,

    #[serde(with = "duration_str")]
    pub query: Duration,
}

impl Default for RetrievalTimeouts {
    fn default() -> Self {
        Self {
            register: Duration::from_secs(60),
            query: Duration::from_secs(30),
        }
    }
}

/// Process-wide defaults handed to the orchestrator at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Inference backend base URL
    pub backend_endpoint: String,

    /// Retrieval service base URL
    pub retrieval_endpoint: String,

    /// Evaluator model for tasks that do not name one
    pub evaluator_model: String,

    /// Augmented prompt template
    pub prompt_template: String,

    /// Evaluator prompt template
    pub evaluation_template: String,

    /// Snippets requested per retrieval query
    pub retrieval_top_k: usize,

    /// Sampling temperature for evaluator calls (near zero: scoring, not writing)
    pub evaluation_temperature: f32,

    pub probe: ProbeSettings,

    pub retrieval_timeouts: RetrievalTimeouts,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backend_endpoint: DEFAULT_BACKEND_ENDPOINT.to_string(),
            retrieval_endpoint: DEFAULT_RETRIEVAL_ENDPOINT.to_string(),
            evaluator_model: DEFAULT_EVALUATOR_MODEL.to_string(),
            prompt_template: DEFAULT_AUGMENTED_TEMPLATE.to_string(),
            evaluation_template: DEFAULT_EVALUATION_TEMPLATE.to_string(),
            retrieval_top_k: 4,
            evaluation_temperature: 0.1,
            probe: ProbeSettings::default(),
            retrieval_timeouts: RetrievalTimeouts::default(),
        }
    }
}

impl RunConfig {
    /// Resolve a task's effective settings against these defaults.
    pub fn resolve<'a>(&'a self, task: &'a Task) -> ResolvedTask<'a> {
        ResolvedTask {
            task,
            backend_endpoint: task
                .backend_endpoint
                .as_deref()
                .unwrap_or(&self.backend_endpoint),
            retrieval_endpoint: task
                .retrieval_endpoint
                .as_deref()
                .unwrap_or(&self.retrieval_endpoint),
            evaluator_model: task
                .evaluator_model
                .as_deref()
                .unwrap_or(&self.evaluator_model),
            prompt_template: task
                .prompt_template
                .as_deref()
                .unwrap_or(&self.prompt_template),
            evaluation_template: task
                .evaluation_template
                .as_deref()
                .unwrap_or(&self.evaluation_template),
        }
    }
}

/// A task together with its effective settings.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTask<'a> {
    pub task: &'a Task,
    pub backend_endpoint: &'a str,
    pub retrieval_endpoint: &'a str,
    pub evaluator_model: &'a str,
    pub prompt_template: &'a str,
    pub evaluation_template: &'a str,
}

/// A run file: optional defaults plus an ordered task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub defaults: RunConfig,

    pub tasks: Vec<Task>,
}

impl RunFile {
    /// Parse a run file from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let run: RunFile = serde_yaml::from_str(yaml)?;
        run.validate()?;
        Ok(run)
    }

    /// Parse a run file from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let run: RunFile = serde_json::from_str(json)?;
        run.validate()?;
        Ok(run)
    }

    /// Load from disk; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let run = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        tracing::debug!(path = %path.display(), tasks = run.tasks.len(), "Loaded run file");
        Ok(run)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (index, task) in self.tasks.iter().enumerate() {
            let invalid = |reason: &str| ConfigError::InvalidTask {
                index,
                reason: reason.to_string(),
            };

            if task.question.trim().is_empty() {
                return Err(invalid("question is empty"));
            }
            if task.candidate_models.is_empty() {
                return Err(invalid("no candidate models"));
            }
            if task.report_path.as_os_str().is_empty() {
                return Err(invalid("report path is empty"));
            }
        }
        Ok(())
    }
}

/// Serde adapter for human-readable durations ("2s", "1m 30s").
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
