//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::AniError;

/// How a backend client retries a failed call.
///
/// Only errors for which [`AniError::is_retryable`] holds are retried. A
/// rate-limit hint from the server ([`AniError::retry_after`]) stretches the
/// wait up to `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self::with_max_attempts(1)
    }

    /// Default backoff with a custom attempt budget (clamped to at least one).
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails with a final error, or the
    /// attempt budget is spent.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, AniError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AniError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            tracing::warn!(
                attempt,
                max_attempts,
                error = %err,
                "Retrying backend call"
            );

            // 75% to 125% of the nominal backoff.
            let jitter = 0.75 + jitter_factor() * 0.5;
            let mut delay = Duration::from_secs_f64(backoff.as_secs_f64() * jitter);
            if let Some(hint) = err.retry_after() {
                delay = delay.max(hint.min(self.max_backoff));
            }
            tokio::time::sleep(delay).await;

            backoff = Duration::from_secs_f64(
                (backoff.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64()),
            );
        }
    }
}

/// Pseudo-random factor in [0, 1).
fn jitter_factor() -> f64 {
    let bits = uuid::Uuid::new_v4().as_u128();
    (bits % 10_000) as f64 / 10_000.0
}
