//! Task orchestrator for sequential answer ranking.
//!
//! For every task, in order, the orchestrator:
//! - Reuses or replaces the backend connection (keyed by endpoint string)
//! - Registers source documents when retrieval is requested
//! - Generates one answer per candidate model and scores the successful ones
//! - Ranks the results and appends the rendered report to the task's file
//!
//! Everything runs strictly one call at a time.

use modelrank_core::{rank, EvaluationResult, RankedEntry, RankedReport, RunConfig, Task};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::evaluator::Evaluator;
use crate::generator::{Augmentation, ResponseGenerator};
use crate::persist::append_report;
use crate::providers::{BackendConnector, InferenceBackend, OllamaConnector, ProviderError};
use crate::retrieval::{RetrievalClient, Retriever};

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Failed to connect to backend at {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Orchestrator not configured: {0}")]
    NotConfigured(String),
}

/// What one task produced.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub report_path: PathBuf,

    /// Whether registration succeeded and generation could use retrieval
    pub retrieval_enabled: bool,

    pub ranking: RankedReport,
}

impl TaskReport {
    pub fn entries(&self) -> usize {
        self.ranking.len()
    }
}

/// Result of a full run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub tasks: Vec<TaskReport>,
}

impl RunSummary {
    /// Total ranked entries across all tasks.
    pub fn total_entries(&self) -> usize {
        self.tasks.iter().map(TaskReport::entries).sum()
    }
}

struct BackendConnection {
    endpoint: String,
    backend: Arc<dyn InferenceBackend>,
}

/// Remembers the last backend connection.
struct ConnectionCache {
    connector: Arc<dyn BackendConnector>,
    current: Option<BackendConnection>,
}

impl ConnectionCache {
    async fn get(&mut self, endpoint: &str) -> Result<Arc<dyn InferenceBackend>, ProviderError> {
        if let Some(connection) = &self.current {
            if connection.endpoint == endpoint {
                return Ok(Arc::clone(&connection.backend));
            }
        }

        tracing::info!(endpoint = %endpoint, "Connecting to backend");
        let backend = self.connector.connect(endpoint).await?;
        self.current = Some(BackendConnection {
            endpoint: endpoint.to_string(),
            backend: Arc::clone(&backend),
        });
        Ok(backend)
    }
}

/// Runs evaluation tasks one after another.
pub struct TaskOrchestrator {
    config: RunConfig,
    connections: ConnectionCache,
    retriever: Arc<dyn Retriever>,
    generator: ResponseGenerator,
    evaluator: Evaluator,
}

impl TaskOrchestrator {
    /// Create an orchestrator from explicit collaborators.
    pub fn new(
        config: RunConfig,
        connector: Arc<dyn BackendConnector>,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        let generator = ResponseGenerator::new(Arc::clone(&retriever), config.retrieval_top_k);
        let evaluator = Evaluator::new(config.evaluation_temperature);

        Self {
            connections: ConnectionCache {
                connector,
                current: None,
            },
            retriever,
            generator,
            evaluator,
            config,
        }
    }

    /// Orchestrator wired to Ollama and the HTTP retrieval client.
    pub fn ollama(config: RunConfig) -> Self {
        let connector = Arc::new(OllamaConnector::new(config.probe.request_timeout));
        let retriever = Arc::new(RetrievalClient::new(&config.retrieval_timeouts));
        Self::new(config, connector, retriever)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every task in order.
    ///
    /// A backend connection failure or a report write failure aborts the
    /// run. Per-model failures only degrade that model's entry.
    pub async fn run(&mut self, tasks: &[Task]) -> Result<RunSummary, OrchestratorError> {
        let mut summary = RunSummary::default();

        for (index, task) in tasks.iter().enumerate() {
            tracing::info!(
                task = index + 1,
                of = tasks.len(),
                question = %task.question,
                "Starting task"
            );
            summary.tasks.push(self.run_task(task).await?);
        }

        tracing::info!(
            tasks = summary.tasks.len(),
            entries = summary.total_entries(),
            "Run complete"
        );
        Ok(summary)
    }

    async fn run_task(&mut self, task: &Task) -> Result<TaskReport, OrchestratorError> {
        let resolved = self.config.resolve(task);

        let backend = self
            .connections
            .get(resolved.backend_endpoint)
            .await
            .map_err(|source| OrchestratorError::Connection {
                endpoint: resolved.backend_endpoint.to_string(),
                source,
            })?;

        let retrieval_enabled = if task.wants_registration() {
            self.retriever
                .register(&task.source_files, resolved.retrieval_endpoint)
                .await
                .is_ready()
        } else {
            if task.use_retrieval {
                tracing::warn!("Retrieval requested without source files; using plain prompts");
            }
            false
        };

        let augmentation = retrieval_enabled.then_some(Augmentation {
            template: resolved.prompt_template,
            service_url: resolved.retrieval_endpoint,
        });

        let mut entries = Vec::with_capacity(task.candidate_models.len());
        for model in &task.candidate_models {
            let generation = self
                .generator
                .generate(backend.as_ref(), model, &task.question, augmentation)
                .await;

            let evaluation = match &generation.answer {
                Ok(answer) => {
                    self.evaluator
                        .evaluate(
                            backend.as_ref(),
                            resolved.evaluator_model,
                            &task.question,
                            answer,
                            generation.latency,
                            resolved.evaluation_template,
                        )
                        .await
                }
                Err(failure) => {
                    tracing::warn!(model = %model, reason = %failure, "Skipping evaluation");
                    EvaluationResult::generation_failed()
                }
            };

            entries.push(RankedEntry::new(generation, evaluation));
        }

        let ranking = rank(&task.question, resolved.evaluator_model, entries);
        append_report(&task.report_path, &ranking.render())
            .await
            .map_err(|source| OrchestratorError::Report {
                path: task.report_path.clone(),
                source,
            })?;

        Ok(TaskReport {
            report_path: task.report_path.clone(),
            retrieval_enabled,
            ranking,
        })
    }
}

/// Builder for TaskOrchestrator.
pub struct TaskOrchestratorBuilder {
    config: RunConfig,
    connector: Option<Arc<dyn BackendConnector>>,
    retriever: Option<Arc<dyn Retriever>>,
}

impl TaskOrchestratorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            connector: None,
            retriever: None,
        }
    }

    /// Set the run configuration.
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the backend connector.
    pub fn connector(mut self, connector: Arc<dyn BackendConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Set the retriever. Defaults to the HTTP retrieval client.
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<TaskOrchestrator, OrchestratorError> {
        let connector = self
            .connector
            .ok_or_else(|| OrchestratorError::NotConfigured("No connector set".to_string()))?;
        let retriever = self.retriever.unwrap_or_else(|| {
            Arc::new(RetrievalClient::new(&self.config.retrieval_timeouts)) as Arc<dyn Retriever>
        });

        Ok(TaskOrchestrator::new(self.config, connector, retriever))
    }
}

impl Default for TaskOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
