//! # modelrank-runtime
//!
//! Everything in modelrank that talks to the outside world.
//!
//! This crate provides:
//! - The Ollama HTTP provider behind the [`InferenceBackend`] trait
//! - Readiness polling with exponential backoff and local process supervision
//! - The retrieval service client behind the [`Retriever`] trait
//! - Answer generation, evaluation and the sequential [`TaskOrchestrator`]
//!
//! Pure logic (templates, score parsing, ranking, configuration) lives in
//! `modelrank-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use modelrank_core::{RunConfig, Task};
//! use modelrank_runtime::TaskOrchestrator;
//!
//! let mut orchestrator = TaskOrchestrator::ollama(RunConfig::default());
//! let task = Task::new("What is the Earth's core made of?", vec!["llama3.1:8b".into()], "result.log");
//! let summary = orchestrator.run(&[task]).await?;
//! ```

pub mod evaluator;
pub mod generator;
pub mod guard;
pub mod orchestrator;
pub mod persist;
pub mod providers;
pub mod resilience;
pub mod retrieval;
pub mod supervisor;

pub use evaluator::{Evaluator, EVALUATION_TEMPERATURE};
pub use generator::{Augmentation, ResponseGenerator};
pub use guard::{ensure_model, ModelStatus};
pub use orchestrator::{
    OrchestratorError, RunSummary, TaskOrchestrator, TaskOrchestratorBuilder, TaskReport,
};
pub use persist::append_report;
pub use providers::{
    BackendConnector, GenerateRequest, InferenceBackend, LivenessProbe, OllamaConnector,
    OllamaProvider, ProbeOutcome, ProviderError, SamplingOptions,
};
pub use resilience::{wait_until_ready, BackoffPolicy, ProbeError};
pub use retrieval::{classify_registration, Registration, RetrievalClient, Retriever};
pub use supervisor::{BackendSupervisor, SupervisorConfig, SupervisorError, SupervisorOutcome};
