use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Reason a cancellable operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation was cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellation scope with an optional deadline.
///
/// Scopes form a tree: cancelling a scope cancels every scope derived from
/// it with [`child`](Self::child) or [`with_timeout`](Self::with_timeout).
/// [`detached`](Self::detached) starts a new tree, so cleanup work can keep
/// running after the caller gave up.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A root scope that expires after `timeout`.
    #[must_use]
    pub fn detached(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// A child scope whose deadline is the earlier of the parent's and
    /// `now + timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, candidate) {
            (Some(current), Some(new)) => Some(current.min(new)),
            (current, new) => current.or(new),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, `None` when the scope has none.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// # Errors
    ///
    /// Returns the reason when the scope was cancelled or its deadline passed.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Blocks for `duration`, waking early if the scope is interrupted.
    ///
    /// A `duration` too large to represent waits until the scope ends.
    ///
    /// # Errors
    ///
    /// Returns the interruption reason if the scope ends before `duration`
    /// elapsed.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let until = Instant::now().checked_add(duration);
        loop {
            self.check()?;
            let now = Instant::now();
            let slice = match until {
                Some(until) if now >= until => return Ok(()),
                Some(until) => SLEEP_SLICE.min(until - now),
                None => SLEEP_SLICE,
            };
            thread::sleep(slice);
        }
    }
}
