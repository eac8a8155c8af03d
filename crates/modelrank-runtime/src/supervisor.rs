//! Local backend process supervision.
//!
//! Checks whether the backend answers its management command and, if not,
//! launches the server in the background and waits for it to become ready.

use modelrank_core::ProbeSettings;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

use crate::providers::{LivenessProbe, OllamaProvider, ProviderError};
use crate::resilience::{wait_until_ready, BackoffPolicy, ProbeError};

/// Errors from the backend supervisor. All of them are fatal to a run.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("'{program}' is not installed or not on PATH")]
    MissingExecutable { program: String },

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("backend at {endpoint} never became ready: {source}")]
    Connectivity {
        endpoint: String,
        #[source]
        source: ProbeError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// How the backend is checked and started.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Backend executable
    pub program: String,

    /// Cheap management command; exit status 0 means the server is up
    pub status_args: Vec<String>,

    /// Arguments that start the server
    pub serve_args: Vec<String>,

    /// Endpoint probed after launching
    pub endpoint: String,

    pub policy: BackoffPolicy,
}

impl SupervisorConfig {
    /// `ollama list` / `ollama serve` against `endpoint`.
    pub fn ollama(endpoint: impl Into<String>, probe: &ProbeSettings) -> Self {
        Self {
            program: "ollama".to_string(),
            status_args: vec!["list".to_string()],
            serve_args: vec!["serve".to_string()],
            endpoint: endpoint.into(),
            policy: BackoffPolicy::from(probe),
        }
    }
}

/// What [`BackendSupervisor::ensure_running`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorOutcome {
    AlreadyRunning,
    Launched { attempts: usize },
}

/// Ensures a local backend server is running.
pub struct BackendSupervisor {
    config: SupervisorConfig,
    probe: Arc<dyn LivenessProbe>,
}

impl BackendSupervisor {
    pub fn new(config: SupervisorConfig, probe: Arc<dyn LivenessProbe>) -> Self {
        Self { config, probe }
    }

    /// Supervisor for a local Ollama install, probing `endpoint`.
    pub fn ollama(endpoint: &str, settings: &ProbeSettings) -> Result<Self, SupervisorError> {
        let probe = OllamaProvider::new(endpoint)?.with_probe_timeout(settings.request_timeout);
        Ok(Self::new(
            SupervisorConfig::ollama(endpoint, settings),
            Arc::new(probe),
        ))
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Start the backend if needed and wait until it is ready.
    pub async fn ensure_running(&self) -> Result<SupervisorOutcome, SupervisorError> {
        let program = &self.config.program;

        let status = Command::new(program)
            .args(&self.config.status_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.launch_error(e))?;

        if status.success() {
            tracing::info!(program = %program, "Backend already running");
            return Ok(SupervisorOutcome::AlreadyRunning);
        }

        tracing::info!(program = %program, args = ?self.config.serve_args, "Starting backend server");
        let mut command = Command::new(program);
        command
            .args(&self.config.serve_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        command.process_group(0);

        // The child handle is dropped without killing the server.
        let _child = command.spawn().map_err(|e| self.launch_error(e))?;

        let attempts = wait_until_ready(self.probe.as_ref(), &self.config.policy)
            .await
            .map_err(|source| SupervisorError::Connectivity {
                endpoint: self.config.endpoint.clone(),
                source,
            })?;

        Ok(SupervisorOutcome::Launched { attempts })
    }

    fn launch_error(&self, error: io::Error) -> SupervisorError {
        if error.kind() == io::ErrorKind::NotFound {
            SupervisorError::MissingExecutable {
                program: self.config.program.clone(),
            }
        } else {
            SupervisorError::Launch {
                program: self.config.program.clone(),
                source: error,
            }
        }
    }
}
