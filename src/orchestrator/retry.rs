// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Call Retry
//!
//! Every provider call runs under a timeout. Transient failures are
//! retried with bounded exponential backoff. Timeouts are retried only
//! when repeating the call is harmless; anything else is returned on the
//! first attempt.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::provider::{ProviderError, ProviderResult};

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }
}

/// Whether a call may be repeated after a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Update, delete and reads converge on the same result
    Idempotent,
    /// A repeat could act twice (create)
    NonIdempotent,
}

/// Run `call` under `timeout`, retrying transient failures and, for idempotent calls, timeouts
///
/// `operation` names the call in logs and timeout errors.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    operation: &str,
    idempotency: Idempotency,
    mut call: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                operation: operation.to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        };

        match result {
            Err(e) if retryable(&e, idempotency) && attempt < attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient provider failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn retryable(error: &ProviderError, idempotency: Idempotency) -> bool {
    error.is_transient() || (error.is_timeout() && idempotency == Idempotency::Idempotent)
}
