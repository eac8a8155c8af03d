//! Readiness polling with exponential backoff.
//!
//! The delay between attempt `i` (0-indexed) and `i + 1` is
//! `initial_delay * 2^i`. No sleep follows the final failed attempt.

use backon::{Retryable, Sleeper};
use modelrank_core::ProbeSettings;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::providers::{LivenessProbe, ProbeOutcome};

/// Errors from the readiness prober.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("backend not ready after {attempts} attempts (last: {last_reason})")]
    ConnectivityExhausted { attempts: usize, last_reason: String },
}

/// How often and how patiently to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Probe attempts before giving up
    pub max_retries: usize,

    /// Delay after the first failed attempt
    pub initial_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_retries: usize, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Delay slept after failed attempt `attempt` (0-indexed).
    ///
    /// Saturates at `Duration::MAX` once the doubling overflows.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        u32::try_from(attempt)
            .ok()
            .and_then(|exp| 2u32.checked_pow(exp))
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Delays between attempts; one fewer than `max_retries`.
    fn delays(self) -> impl Iterator<Item = Duration> + Send + Sync + Unpin {
        (0..self.max_retries.saturating_sub(1)).map(move |attempt| self.delay_for(attempt))
    }
}

impl From<&ProbeSettings> for BackoffPolicy {
    fn from(settings: &ProbeSettings) -> Self {
        Self::new(settings.max_retries, settings.initial_delay)
    }
}

/// Poll `probe` until it reports ready, sleeping on the Tokio timer.
///
/// Returns the number of attempts it took.
pub async fn wait_until_ready(
    probe: &dyn LivenessProbe,
    policy: &BackoffPolicy,
) -> Result<usize, ProbeError> {
    wait_until_ready_with(probe, policy, |delay| tokio::time::sleep(delay)).await
}

/// [`wait_until_ready`] with an explicit sleeper.
pub async fn wait_until_ready_with<S: Sleeper>(
    probe: &dyn LivenessProbe,
    policy: &BackoffPolicy,
    sleeper: S,
) -> Result<usize, ProbeError> {
    if policy.max_retries == 0 {
        return Err(ProbeError::ConnectivityExhausted {
            attempts: 0,
            last_reason: "no attempts allowed".to_string(),
        });
    }

    let attempts = AtomicUsize::new(0);
    let counter = &attempts;

    let outcome = (move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        match probe.probe().await {
            ProbeOutcome::Ready => Ok(()),
            ProbeOutcome::NotReady { reason } => Err(reason),
        }
    })
    .retry(policy.delays())
    .sleep(sleeper)
    .notify(|reason: &String, delay: Duration| {
        tracing::warn!(reason = %reason, retry_in = ?delay, "Backend not ready yet");
    })
    .await;

    let attempts = attempts.load(Ordering::SeqCst);
    match outcome {
        Ok(()) => {
            tracing::info!(attempts, "Backend is ready");
            Ok(attempts)
        }
        Err(last_reason) => {
            tracing::error!(attempts, reason = %last_reason, "Backend readiness exhausted");
            Err(ProbeError::ConnectivityExhausted {
                attempts,
                last_reason,
            })
        }
    }
}
