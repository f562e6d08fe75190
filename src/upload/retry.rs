// Exponential backoff around a single fallible request. The schedule comes
// from backon's `ExponentialBuilder`; `RetryPolicy` owns the numbers and the
// wall-clock budget.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use backon::{BlockingRetryable, ExponentialBuilder};
use tracing::warn;

use crate::error::{UploadError, UploadResult};

/// How a failed request is retried.
///
/// Delays start at `initial_delay` and grow by `backoff_factor`, capped at
/// `max_delay`. Retrying stops once `max_elapsed` has passed since the first
/// attempt; the last wait is shortened so the budget is not overshot.
#[derive(Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub backoff_factor: f32,
    pub max_delay: Duration,
    pub max_elapsed: Duration,
    /// Decides whether an error is worth another attempt.
    pub retryable: fn(&UploadError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(60),
            retryable: UploadError::is_transport,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("initial_delay", &self.initial_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("max_delay", &self.max_delay)
            .field("max_elapsed", &self.max_elapsed)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_elapsed: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Unbounded delay schedule. The time budget is enforced by `retry`,
    /// which measures wall-clock time rather than summed sleeps.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_factor(self.backoff_factor)
            .with_max_delay(self.max_delay)
            .without_max_times()
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// time budget runs out. `op` receives the 1-based attempt number.
    pub fn retry<T>(
        &self,
        operation: &str,
        mut op: impl FnMut(u32) -> UploadResult<T>,
    ) -> UploadResult<T> {
        let started = Instant::now();
        let budget = self.max_elapsed;
        let retryable = self.retryable;
        let mut attempts = 0u32;

        let result = (|| {
            attempts = attempts.saturating_add(1);
            op(attempts)
        })
        .retry(self.backoff())
        .sleep(move |delay| thread::sleep(clamp_to_budget(delay, budget, started.elapsed())))
        .when(|err| retryable(err) && started.elapsed() < budget)
        .notify(|err, delay| {
            warn!(
                operation,
                delay_ms = clamp_to_budget(delay, budget, started.elapsed()).as_millis() as u64,
                error = %err,
                "retrying after transport failure"
            );
        })
        .call();

        match result {
            Err(err) if retryable(&err) => Err(UploadError::RetriesExhausted {
                operation: operation.to_string(),
                attempts,
                elapsed: started.elapsed(),
                source: Box::new(err),
            }),
            other => other,
        }
    }
}

/// Shortens `delay` so that sleeping it does not run past `budget`.
fn clamp_to_budget(delay: Duration, budget: Duration, elapsed: Duration) -> Duration {
    delay.min(budget.saturating_sub(elapsed))
}
