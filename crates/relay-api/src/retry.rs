//! Backoff policy for transient chat-completion failures.

use rand::Rng;
use relay_types::ApiError;
use std::time::Duration;

/// How often and how patiently the client retries a failed completion.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying).
    pub max_retries: u32,
    /// Base delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth of the base delay per attempt.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether `attempt` (zero-based) may be followed by another one after `error`.
    pub(crate) fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        attempt < self.max_retries && is_transient(error)
    }

    /// Delay before the retry that follows `attempt`.
    ///
    /// A server-provided `Retry-After` wins over the computed backoff; either
    /// way the result never exceeds `max_delay_ms`. Computed delays carry
    /// +/-25% jitter.
    pub(crate) fn delay(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        let ms = match retry_after_ms {
            Some(server_ms) => server_ms.min(self.max_delay_ms),
            None => {
                let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
                let base = (self.initial_delay_ms as f64 * self.backoff_factor.powi(exp))
                    .min(self.max_delay_ms as f64);
                let jitter = rand::rng().random_range(0.75..=1.25);
                ((base * jitter) as u64).min(self.max_delay_ms)
            }
        };
        Duration::from_millis(ms)
    }
}

/// Errors that may succeed on a second try.
pub(crate) fn is_transient(error: &ApiError) -> bool {
    matches!(
        error,
        ApiError::RateLimited { .. }
            | ApiError::Server { .. }
            | ApiError::Network(_)
            | ApiError::Timeout
    )
}
