//! Resilience patterns for modelrank-runtime.
//!
//! This module provides:
//! - Exponential backoff policy for readiness checks
//! - The readiness prober that polls a [`LivenessProbe`](crate::providers::LivenessProbe)

mod backoff;

pub use backoff::{wait_until_ready, wait_until_ready_with, BackoffPolicy, ProbeError};
