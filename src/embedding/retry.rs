// src/embedding/retry.rs
//! Bounded retry with exponential backoff and jitter for embedding calls.
//!
//! Only transient failures are retried (see [`EmbeddingError::is_retriable`]).
//! The schedule doubles from `base_delay` up to `max_delay`; each sleep is drawn
//! uniformly from `[delay / 2, delay]`. A retry is skipped when its sleep would
//! push the total elapsed time past `budget`, so the caller never waits longer
//! than the budget plus one in-flight request.

use rand::Rng;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::EmbeddingError;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    /// Upper bound on time spent across all attempts and sleeps.
    #[serde(rename = "budget_ms", with = "millis")]
    pub budget: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            budget: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts; handy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            budget: Duration::from_secs(60),
        }
    }

    /// Nominal (pre-jitter) delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

fn jittered(delay: Duration) -> Duration {
    let full = delay.as_millis() as u64;
    if full == 0 {
        return Duration::ZERO;
    }
    let ms = rand::rng().random_range(full / 2..=full);
    Duration::from_millis(ms)
}

/// Run `operation` until it succeeds, fails permanently, or the policy is exhausted.
/// Returns the last error on failure.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, EmbeddingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EmbeddingError>>,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retriable() || attempt >= max_attempts {
            return Err(err);
        }

        let sleep = jittered(policy.delay_for(attempt));
        if started.elapsed() + sleep > policy.budget {
            tracing::warn!(
                target: "hotness",
                attempt,
                error = %err,
                "embedding retry budget exhausted"
            );
            return Err(err);
        }

        tracing::warn!(
            target: "hotness",
            attempt,
            max_attempts,
            delay_ms = sleep.as_millis() as u64,
            error = %err,
            "embedding call failed, retrying"
        );
        tokio::time::sleep(sleep).await;
        attempt += 1;
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
