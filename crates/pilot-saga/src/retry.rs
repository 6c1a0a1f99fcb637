use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use pilot_core::{Cancellation, Interrupted};
use tracing::{debug, warn};

/// Longest wait between two attempts.
pub const MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// Bounded retry with exponential backoff.
///
/// Every failure is considered retryable until `max_attempts` is reached.
/// The delay before attempt `n + 1` is `initial_delay * 2^(n - 1)`, capped at
/// [`MAX_DELAY`], without jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// A single attempt, no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// The delay schedule of one run, starting at `initial_delay`.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay.min(MAX_DELAY))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(MAX_DELAY)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Runs `operation` until it succeeds or the attempts are exhausted.
    ///
    /// The scope is checked before every attempt. If it is interrupted while
    /// waiting between attempts, the last operation error is returned.
    ///
    /// # Errors
    ///
    /// Returns the last error of `operation`, or the interruption if the
    /// scope ended before the first attempt.
    pub fn run<T, E>(
        &self,
        label: &str,
        cancellation: &Cancellation,
        mut operation: impl FnMut(u32) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<Interrupted> + std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.backoff();
        let mut attempt = 1;
        loop {
            cancellation.check()?;

            let error = match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= max_attempts {
                return Err(error);
            }

            let delay = backoff.next_backoff().unwrap_or(MAX_DELAY);
            warn!(label, attempt, max_attempts, ?delay, %error, "attempt failed, retrying");
            if let Err(interrupted) = cancellation.sleep(delay) {
                debug!(label, %interrupted, "retry interrupted");
                return Err(error);
            }
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(1))
    }
}
