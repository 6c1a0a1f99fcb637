use std::path::Path;

use crate::Result;

/// What to open (or update) on the code host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest<'a> {
    pub head: &'a str,
    pub base: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub labels: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl PullRequestState {
    #[must_use]
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

pub trait CodeHost: Send + Sync {
    /// Opens a pull request from `head` into `base`, or updates the open one.
    ///
    /// Returns the pull request number.
    ///
    /// # Errors
    ///
    /// Returns an error if the code host rejects the request.
    fn create_or_update_pr(&self, project_root: &Path, pr: &PullRequest<'_>) -> Result<u64>;

    /// # Errors
    ///
    /// Returns an error if the comment cannot be posted.
    fn add_comment(&self, project_root: &Path, number: u64, body: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns [`OperationError::PullRequestAlreadyClosed`](crate::OperationError::PullRequestAlreadyClosed)
    /// if there is nothing left to close.
    fn close_pr(&self, project_root: &Path, number: u64) -> Result<()>;

    /// Live state of a pull request; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the code host cannot be queried.
    fn pr_state(&self, project_root: &Path, number: u64) -> Result<Option<PullRequestState>>;
}
