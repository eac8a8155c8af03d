//! Candidate answer generation.

use modelrank_core::{render_augmented_prompt, GenerationFailure, GenerationResult, PromptMode};
use std::sync::Arc;
use tokio::time::Instant;

use crate::guard::ensure_model;
use crate::providers::{GenerateRequest, InferenceBackend};
use crate::retrieval::Retriever;

/// Where to fetch context for an augmented prompt.
#[derive(Debug, Clone, Copy)]
pub struct Augmentation<'a> {
    /// Template with `{context}` and `{question}` placeholders
    pub template: &'a str,

    /// Retrieval service base URL
    pub service_url: &'a str,
}

/// Produces one candidate answer per call.
pub struct ResponseGenerator {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
}

impl ResponseGenerator {
    pub fn new(retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self { retriever, top_k }
    }

    /// Ask `model` the `question`, optionally augmented with retrieved context.
    ///
    /// Never fails. An unavailable model yields
    /// [`GenerationFailure::ModelUnavailable`] with zero latency; a backend
    /// failure yields [`GenerationFailure::Backend`] with the measured latency.
    pub async fn generate(
        &self,
        backend: &dyn InferenceBackend,
        model: &str,
        question: &str,
        augmentation: Option<Augmentation<'_>>,
    ) -> GenerationResult {
        if !ensure_model(backend, model).await.is_available() {
            return GenerationResult::model_unavailable(model);
        }

        let (prompt, mode) = match augmentation {
            Some(augmentation) => {
                let context = self
                    .retriever
                    .retrieve(question, augmentation.service_url, self.top_k)
                    .await;
                if context.is_empty() {
                    tracing::info!(model = %model, "No context retrieved; using plain prompt");
                    (question.to_string(), PromptMode::Plain)
                } else {
                    (
                        render_augmented_prompt(augmentation.template, &context, question),
                        PromptMode::Augmented,
                    )
                }
            }
            None => (question.to_string(), PromptMode::Plain),
        };

        tracing::info!(model = %model, mode = mode.label(), "Generating answer");
        let request = GenerateRequest::new(model, prompt);
        let started = Instant::now();
        let outcome = backend.generate(&request).await;
        let latency = started.elapsed();

        match outcome {
            Ok(answer) => {
                tracing::debug!(model = %model, latency = ?latency, "Answer generated");
                GenerationResult::success(model, answer.trim(), latency, mode)
            }
            Err(e) => {
                tracing::error!(model = %model, error = %e, "Generation failed");
                GenerationResult::failure(
                    model,
                    GenerationFailure::Backend(e.to_string()),
                    latency,
                    mode,
                )
            }
        }
    }
}
