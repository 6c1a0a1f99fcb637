use std::time::Duration;

use crate::retry::RetryPolicy;

/// Runtime settings for a saga, passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaConfig {
    /// Persist progress and compensate completed steps when a step fails.
    /// When `false` the saga fails fast and nothing is written to disk.
    pub enable_rollback: bool,
    /// Applied to every execute and every compensate call.
    pub retry: RetryPolicy,
    /// Budget for an automatic rollback, independent of the caller's scope.
    pub rollback_timeout: Duration,
}

impl SagaConfig {
    #[must_use]
    pub fn with_rollback(mut self, enable_rollback: bool) -> Self {
        self.enable_rollback = enable_rollback;
        self
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            enable_rollback: false,
            retry: RetryPolicy::default(),
            rollback_timeout: Duration::from_secs(10 * 60),
        }
    }
}
