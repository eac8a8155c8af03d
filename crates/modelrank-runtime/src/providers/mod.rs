//! Inference backend abstractions for modelrank-runtime.
//!
//! This module defines the traits the rest of the runtime talks to and the
//! Ollama HTTP implementation of them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod ollama;

pub use ollama::{OllamaConnector, OllamaProvider, LIVENESS_MARKER};

/// Errors from inference backends.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Model pull failed: {0}")]
    PullFailed(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Result of a single liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    NotReady { reason: String },
}

impl ProbeOutcome {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Sampling options for a generate call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl SamplingOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
        }
    }

    pub fn is_default(&self) -> bool {
        self.temperature.is_none()
    }
}

/// A non-streaming generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub options: SamplingOptions,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: SamplingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }
}

/// Backend health signal, polled by the readiness prober.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// One liveness check. Transport failures are `NotReady`, never errors.
    async fn probe(&self) -> ProbeOutcome;
}

/// An inference backend that hosts models and generates text.
///
/// Every model call in the runtime goes through this trait.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Base URL this backend talks to.
    fn endpoint(&self) -> &str;

    /// Fetch or validate `model`, draining the progress stream.
    ///
    /// Returns the number of progress events seen. Completes immediately when
    /// the model is already present.
    async fn pull_model(&self, model: &str) -> Result<usize, ProviderError>;

    /// Generate a complete response for `request`.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Creates backend handles for an endpoint.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn InferenceBackend>, ProviderError>;
}
