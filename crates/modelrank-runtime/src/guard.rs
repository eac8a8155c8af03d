//! Model availability guard.

use crate::providers::InferenceBackend;

/// Whether a model can be used on a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Available,
    Unavailable { reason: String },
}

impl ModelStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Make sure `model` is present on `backend`, pulling it if needed.
///
/// Never fails: every problem is reported as [`ModelStatus::Unavailable`].
pub async fn ensure_model(backend: &dyn InferenceBackend, model: &str) -> ModelStatus {
    tracing::info!(model = %model, backend = backend.name(), "Checking model availability");

    match backend.pull_model(model).await {
        Ok(events) => {
            tracing::debug!(model = %model, events, "Model ready");
            ModelStatus::Available
        }
        Err(e) => {
            tracing::warn!(model = %model, error = %e, "Model unavailable");
            ModelStatus::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{GenerateRequest, ProviderError};
    use async_trait::async_trait;

    struct PullOnly {
        fail: bool,
    }

    #[async_trait]
    impl InferenceBackend for PullOnly {
        fn endpoint(&self) -> &str {
            "mock://"
        }

        async fn pull_model(&self, _model: &str) -> Result<usize, ProviderError> {
            if self.fail {
                Err(ProviderError::PullFailed("file does not exist".into()))
            } else {
                Ok(2)
            }
        }

        async fn generate(&self, _request: &GenerateRequest) -> Result<String, ProviderError> {
            unreachable!("guard never generates")
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    #[tokio::test]
    async fn test_available() {
        let status = ensure_model(&PullOnly { fail: false }, "llama3.1:8b").await;
        assert!(status.is_available());
    }

    #[tokio::test]
    async fn test_pull_failure_is_unavailable() {
        let status = ensure_model(&PullOnly { fail: true }, "ghost").await;
        assert!(!status.is_available());
        assert!(matches!(status, ModelStatus::Unavailable { reason } if reason.contains("does not exist")));
    }
}
