//! Ollama HTTP provider.
//!
//! Talks to the Ollama REST API:
//! - `GET /` answers `Ollama is running` once the server is up
//! - `POST /api/pull` streams NDJSON progress events
//! - `POST /api/generate` with `stream: false` returns `{ "response": ... }`

use super::{
    BackendConnector, GenerateRequest, InferenceBackend, LivenessProbe, ProbeOutcome,
    ProviderError, SamplingOptions,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Body text of a healthy Ollama root endpoint.
pub const LIVENESS_MARKER: &str = "Ollama is running";

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama inference backend.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl OllamaProvider {
    /// Create a provider for `base_url` (e.g. `http://127.0.0.1:11434`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    /// Set the timeout of a single liveness request.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Serialize)]
struct PullBody<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct PullEvent {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "SamplingOptions::is_default")]
    options: &'a SamplingOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    ProviderError::HttpError(e.to_string())
}

fn timed_transport_error(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        transport_error(e)
    }
}

async fn api_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<OllamaError>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    ProviderError::ApiError { status, message }
}

/// Interpret one NDJSON line of a pull stream; returns the events it holds.
fn pull_line(line: &[u8], model: &str) -> Result<usize, ProviderError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(0);
    }

    match serde_json::from_str::<PullEvent>(line) {
        Ok(PullEvent {
            error: Some(error), ..
        }) => Err(ProviderError::PullFailed(error)),
        Ok(PullEvent { status, .. }) => {
            tracing::debug!(model, status = status.as_deref().unwrap_or(""), "Pull progress");
            Ok(1)
        }
        Err(e) => {
            tracing::debug!(model, error = %e, "Unrecognized pull progress line");
            Ok(1)
        }
    }
}

#[async_trait]
impl LivenessProbe for OllamaProvider {
    async fn probe(&self) -> ProbeOutcome {
        let response = match self
            .client
            .get(self.url("/"))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| timed_transport_error(e, self.probe_timeout))
        {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::not_ready(e.to_string()),
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return ProbeOutcome::not_ready(format!("HTTP {}", status.as_u16()));
        }

        match response
            .text()
            .await
            .map_err(|e| timed_transport_error(e, self.probe_timeout))
        {
            Ok(body) if body.contains(LIVENESS_MARKER) => ProbeOutcome::Ready,
            Ok(_) => ProbeOutcome::not_ready("liveness marker missing from response"),
            Err(e) => ProbeOutcome::not_ready(e.to_string()),
        }
    }
}

#[async_trait]
impl InferenceBackend for OllamaProvider {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn pull_model(&self, model: &str) -> Result<usize, ProviderError> {
        let response = self
            .client
            .post(self.url("/api/pull"))
            .json(&PullBody {
                model,
                stream: true,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut events = 0;

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk.map_err(transport_error)?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                events += pull_line(&line, model)?;
            }
        }
        events += pull_line(&buffer, model)?;

        Ok(events)
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&GenerateBody {
                model: &request.model,
                prompt: &request.prompt,
                stream: false,
                options: &request.options,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(reply.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Connects [`OllamaProvider`]s by endpoint.
#[derive(Debug, Clone)]
pub struct OllamaConnector {
    probe_timeout: Duration,
}

impl OllamaConnector {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }
}

impl Default for OllamaConnector {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl BackendConnector for OllamaConnector {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn InferenceBackend>, ProviderError> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ProviderError::NotConfigured(format!(
                "backend endpoint must start with http:// or https://, got '{endpoint}'"
            )));
        }

        let provider = OllamaProvider::new(endpoint)?.with_probe_timeout(self.probe_timeout);
        Ok(Arc::new(provider))
    }
}
