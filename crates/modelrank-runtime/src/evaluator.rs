//! Answer scoring by an evaluator model.

use modelrank_core::{parse_evaluation_output, render_evaluation_prompt, EvaluationResult};
use std::time::Duration;

use crate::guard::ensure_model;
use crate::providers::{GenerateRequest, InferenceBackend, SamplingOptions};

/// Default sampling temperature for evaluator calls.
pub const EVALUATION_TEMPERATURE: f32 = 0.1;

/// Scores candidate answers with an evaluator model.
#[derive(Debug, Clone)]
pub struct Evaluator {
    temperature: f32,
}

impl Evaluator {
    pub fn new(temperature: f32) -> Self {
        Self { temperature }
    }

    /// Score `answer` to `question`. Never fails; problems become a zero score.
    pub async fn evaluate(
        &self,
        backend: &dyn InferenceBackend,
        evaluator_model: &str,
        question: &str,
        answer: &str,
        latency: Duration,
        template: &str,
    ) -> EvaluationResult {
        if !ensure_model(backend, evaluator_model).await.is_available() {
            return EvaluationResult::evaluator_unavailable();
        }

        let prompt = render_evaluation_prompt(template, question, answer, latency.as_secs_f64());
        let request = GenerateRequest::new(evaluator_model, prompt)
            .with_options(SamplingOptions::with_temperature(self.temperature));

        match backend.generate(&request).await {
            Ok(text) => {
                let result = parse_evaluation_output(&text);
                tracing::info!(evaluator = %evaluator_model, score = result.score, "Answer scored");
                result
            }
            Err(e) => {
                tracing::error!(evaluator = %evaluator_model, error = %e, "Evaluator call failed");
                EvaluationResult::evaluator_error(e)
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EVALUATION_TEMPERATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use modelrank_core::evaluation::{EVALUATOR_UNAVAILABLE, SUMMARY_EXTRACTION_FAILED};
    use std::sync::Mutex;

    struct MockJudge {
        available: bool,
        reply: Result<&'static str, &'static str>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl MockJudge {
        fn new(reply: Result<&'static str, &'static str>) -> Self {
            Self {
                available: true,
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InferenceBackend for MockJudge {
        fn endpoint(&self) -> &str {
            "mock://judge"
        }

        async fn pull_model(&self, _model: &str) -> Result<usize, ProviderError> {
            if self.available {
                Ok(0)
            } else {
                Err(ProviderError::HttpError("connection refused".into()))
            }
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply
                .map(str::to_string)
                .map_err(|e| ProviderError::ApiError {
                    status: 500,
                    message: e.to_string(),
                })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    const TEMPLATE: &str = "Q={question} A={answer} T={latency:.2f}";

    #[tokio::test]
    async fn test_scores_with_low_temperature() {
        let judge = MockJudge::new(Ok("<SCORE>87</SCORE><SUMMARY>Good.</SUMMARY>"));
        let result = Evaluator::default()
            .evaluate(&judge, "judge", "core?", "iron", Duration::from_millis(1234), TEMPLATE)
            .await;

        assert_eq!(result, EvaluationResult::new(87, "Good."));
        let requests = judge.requests.lock().unwrap();
        assert_eq!(requests[0].model, "judge");
        assert_eq!(requests[0].prompt, "Q=core? A=iron T=1.23");
        assert_eq!(requests[0].options.temperature, Some(EVALUATION_TEMPERATURE));
    }

    #[tokio::test]
    async fn test_unparseable_reply_degrades() {
        let judge = MockJudge::new(Ok("I liked it."));
        let result = Evaluator::default()
            .evaluate(&judge, "judge", "q", "a", Duration::ZERO, TEMPLATE)
            .await;
        assert_eq!(result.score, 0);
        assert_eq!(result.summary, SUMMARY_EXTRACTION_FAILED);
    }

    #[tokio::test]
    async fn test_backend_error_becomes_summary() {
        let judge = MockJudge::new(Err("out of memory"));
        let result = Evaluator::default()
            .evaluate(&judge, "judge", "q", "a", Duration::ZERO, TEMPLATE)
            .await;
        assert_eq!(result.score, 0);
        assert!(result.summary.starts_with("Evaluator execution error:"));
        assert!(result.summary.contains("out of memory"));
    }

    #[tokio::test]
    async fn test_unavailable_evaluator() {
        let mut judge = MockJudge::new(Ok("<SCORE>99</SCORE>"));
        judge.available = false;
        let result = Evaluator::default()
            .evaluate(&judge, "judge", "q", "a", Duration::ZERO, TEMPLATE)
            .await;
        assert_eq!(result, EvaluationResult::unscored(EVALUATOR_UNAVAILABLE));
        assert!(judge.requests.lock().unwrap().is_empty());
    }
}
