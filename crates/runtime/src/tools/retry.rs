//! Bounded retry with exponential backoff for tool invocations.

use std::future::Future;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::Deserialize;
use tracing::warn;

use super::ToolError;

/// Retry policy applied at the provider-invocation boundary.
///
/// The default makes a single attempt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 500,
            multiplier: 2.0,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// No retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// Delay schedule between attempts. Unjittered, and bounded only by
    /// `max_attempts`.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_backoff_ms))
            .with_multiplier(self.multiplier)
            .with_max_interval(Duration::from_millis(self.max_backoff_ms))
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempts are used up.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ToolError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        let operation = || {
            attempt += 1;
            let last = attempt >= attempts;
            let call = op();
            async move {
                call.await.map_err(|err| {
                    if err.is_transient() && !last {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        };
        let notify = |err: ToolError, delay: Duration| {
            warn!(?delay, error = %err, "tool call failed, retrying");
        };

        backoff::future::retry_notify(self.backoff(), operation, notify).await
    }
}
