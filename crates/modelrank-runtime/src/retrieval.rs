//! Retrieval service client.
//!
//! The service indexes uploaded documents (`POST /register`) and answers
//! similarity queries with a context string (`POST /query`). Every failure
//! degrades: registration reports "not ready" and queries return `""`.

use async_trait::async_trait;
use modelrank_core::RetrievalTimeouts;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Outcome of a document registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// None of the listed files could be read; nothing was sent.
    NoReadableFiles,
    /// The service indexed `chunks` chunks from `files` files.
    Indexed { chunks: u64, files: usize },
    /// The service accepted the upload but indexed nothing.
    NothingIndexed,
    /// The service answered `{"status": "error"}`.
    Rejected { message: String },
    /// JSON with an unexpected shape.
    UnexpectedResponse { body: String },
    /// The body was not JSON.
    NonJson { status: u16 },
    /// The request never completed.
    Transport { reason: String },
}

impl Registration {
    /// Whether retrieval may be used for generation.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }
}

/// Classify a parsed `/register` response body.
pub fn classify_registration(body: &Value, files: usize) -> Registration {
    match body.get("status").and_then(Value::as_str) {
        Some("ok") => match body.get("chunks").and_then(Value::as_u64).unwrap_or(0) {
            0 => Registration::NothingIndexed,
            chunks => Registration::Indexed { chunks, files },
        },
        Some("error") => Registration::Rejected {
            message: body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message")
                .to_string(),
        },
        _ => Registration::UnexpectedResponse {
            body: body.to_string(),
        },
    }
}

/// Document retrieval seam used by the generator and orchestrator.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Upload `files` for indexing.
    async fn register(&self, files: &[PathBuf], service_url: &str) -> Registration;

    /// Context relevant to `query`, or `""` if none could be fetched.
    async fn retrieve(&self, query: &str, service_url: &str, top_k: usize) -> String;
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct QueryReply {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    context: String,
}

/// HTTP client for the retrieval service.
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    client: reqwest::Client,
    register_timeout: Duration,
    query_timeout: Duration,
}

impl RetrievalClient {
    pub fn new(timeouts: &RetrievalTimeouts) -> Self {
        Self {
            client: reqwest::Client::new(),
            register_timeout: timeouts.register,
            query_timeout: timeouts.query,
        }
    }

    async fn read_parts(files: &[PathBuf]) -> Vec<Part> {
        let mut parts = Vec::with_capacity(files.len());
        for path in files {
            match tokio::fs::read(path).await {
                Ok(bytes) => parts.push(Part::bytes(bytes).file_name(file_name(path))),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable source file");
                }
            }
        }
        parts
    }
}

impl Default for RetrievalClient {
    fn default() -> Self {
        Self::new(&RetrievalTimeouts::default())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn endpoint(service_url: &str, path: &str) -> String {
    format!("{}{}", service_url.trim_end_matches('/'), path)
}

#[async_trait]
impl Retriever for RetrievalClient {
    async fn register(&self, files: &[PathBuf], service_url: &str) -> Registration {
        let parts = Self::read_parts(files).await;
        if parts.is_empty() {
            tracing::warn!("No readable source files; retrieval disabled");
            return Registration::NoReadableFiles;
        }

        let uploaded = parts.len();
        let form = parts
            .into_iter()
            .fold(Form::new(), |form, part| form.part("files", part));

        tracing::info!(url = %service_url, files = uploaded, "Registering source files");
        let response = match self
            .client
            .post(endpoint(service_url, "/register"))
            .multipart(form)
            .timeout(self.register_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %service_url, error = %e, "Registration request failed");
                return Registration::Transport {
                    reason: e.to_string(),
                };
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return Registration::Transport {
                    reason: e.to_string(),
                }
            }
        };

        let outcome = match serde_json::from_str::<Value>(&text) {
            Ok(body) => classify_registration(&body, uploaded),
            Err(_) => Registration::NonJson { status },
        };

        match &outcome {
            Registration::Indexed { chunks, .. } => {
                tracing::info!(chunks, files = uploaded, "Source files indexed");
            }
            Registration::Rejected { message } => {
                tracing::warn!(message = %message, "Retrieval service rejected registration");
            }
            other => {
                tracing::warn!(status, outcome = ?other, "Registration did not index anything");
            }
        }
        outcome
    }

    async fn retrieve(&self, query: &str, service_url: &str, top_k: usize) -> String {
        if query.trim().is_empty() {
            return String::new();
        }

        let response = self
            .client
            .post(endpoint(service_url, "/query"))
            .json(&QueryBody { query, top_k })
            .timeout(self.query_timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let reply = match response {
            Ok(response) => response.json::<QueryReply>().await,
            Err(e) => Err(e),
        };

        match reply {
            Ok(reply) => {
                tracing::debug!(count = reply.count, "Retrieved context");
                reply.context
            }
            Err(e) => {
                tracing::warn!(url = %service_url, error = %e, "Context query failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("ui_parts")
            .suffix(".py")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    async fn register_with(response: ResponseTemplate) -> Registration {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(response)
            .mount(&server)
            .await;

        let file = source_file("print('hello')");
        RetrievalClient::default()
            .register(&[file.path().to_path_buf()], &server.uri())
            .await
    }

    #[test]
    fn test_classify_registration() {
        assert_eq!(
            classify_registration(&json!({"status": "ok", "chunks": 0}), 1),
            Registration::NothingIndexed
        );
        assert_eq!(
            classify_registration(&json!({"status": "ok"}), 1),
            Registration::NothingIndexed
        );
        assert!(classify_registration(&json!({"status": "ok", "chunks": 5}), 1).is_ready());
        assert_eq!(
            classify_registration(&json!({"status": "error", "message": "x"}), 1),
            Registration::Rejected {
                message: "x".into()
            }
        );
        assert!(matches!(
            classify_registration(&json!({"state": "done"}), 1),
            Registration::UnexpectedResponse { .. }
        ));
    }

    proptest! {
        #[test]
        fn prop_ready_iff_chunks_indexed(chunks in 0u64..10_000, files in 1usize..8) {
            let outcome = classify_registration(&json!({"status": "ok", "chunks": chunks}), files);
            prop_assert_eq!(outcome.is_ready(), chunks > 0);
        }
    }

    #[tokio::test]
    async fn test_register_indexed() {
        let outcome =
            register_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "chunks": 5})))
                .await;
        assert_eq!(outcome, Registration::Indexed { chunks: 5, files: 1 });
        assert!(outcome.is_ready());
    }

    #[tokio::test]
    async fn test_register_zero_chunks_not_ready() {
        let outcome =
            register_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "chunks": 0})))
                .await;
        assert!(!outcome.is_ready());
    }

    #[tokio::test]
    async fn test_register_status_error() {
        let outcome = register_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"status": "error", "message": "embedding model missing"})),
        )
        .await;
        assert_eq!(
            outcome,
            Registration::Rejected {
                message: "embedding model missing".into()
            }
        );
    }

    #[tokio::test]
    async fn test_register_non_json() {
        let outcome =
            register_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>")).await;
        assert_eq!(outcome, Registration::NonJson { status: 502 });
    }

    #[tokio::test]
    async fn test_register_uploads_basename_and_skips_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "chunks": 3})))
            .expect(1)
            .mount(&server)
            .await;

        let file = source_file("class Button: pass");
        let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
        let files = vec![file.path().to_path_buf(), PathBuf::from("/nonexistent/missing.txt")];

        let outcome = RetrievalClient::default().register(&files, &server.uri()).await;
        assert_eq!(outcome, Registration::Indexed { chunks: 3, files: 1 });

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"files\""));
        assert!(body.contains(&format!("filename=\"{name}\"")));
        assert!(body.contains("class Button: pass"));
        assert!(!body.contains("missing.txt"));
    }

    #[tokio::test]
    async fn test_register_without_readable_files_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = RetrievalClient::default()
            .register(&[PathBuf::from("/nonexistent/a.txt")], &server.uri())
            .await;
        assert_eq!(outcome, Registration::NoReadableFiles);
    }

    #[tokio::test]
    async fn test_register_transport_failure() {
        let outcome = RetrievalClient::default()
            .register(&[source_file("x").path().to_path_buf()], "http://127.0.0.1:1")
            .await;
        assert!(matches!(outcome, Registration::Transport { .. }));
    }

    #[tokio::test]
    async fn test_retrieve_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_json(json!({"query": "What is a Button?", "top_k": 4})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"count": 2, "context": "Button docs"})),
            )
            .mount(&server)
            .await;

        let context = RetrievalClient::default()
            .retrieve("What is a Button?", &server.uri(), 4)
            .await;
        assert_eq!(context, "Button docs");
    }

    #[tokio::test]
    async fn test_retrieve_empty_query_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = RetrievalClient::default();
        assert_eq!(client.retrieve("", &server.uri(), 4).await, "");
        assert_eq!(client.retrieve("   \n", &server.uri(), 4).await, "");
    }

    #[tokio::test]
    async fn test_retrieve_failures_are_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"context": "ignored"})))
            .mount(&server)
            .await;

        let client = RetrievalClient::default();
        assert_eq!(client.retrieve("q", &server.uri(), 4).await, "");
        assert_eq!(client.retrieve("q", "http://127.0.0.1:1", 4).await, "");
    }
}
