//! Undo actions for the side effects of release steps.
//!
//! Every function inspects live state first and returns `Ok` when there is
//! nothing left to undo, so calling one twice is harmless.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pilot_core::{BranchRollback, Cancellation, RunMetadata};
use pilot_saga::RetryPolicy;
use tracing::{debug, info, warn};

use crate::traits::{CodeHost, PullRequestState, VersionControl};
use crate::{OperationError, Result};

pub const ROLLBACK_COMMENT: &str =
    "This pull request was automatically closed due to a rollback of the release workflow.";

const FALLBACK_BRANCHES: [&str; 2] = ["main", "master"];

pub struct Compensations<G, H> {
    project_root: PathBuf,
    vcs: Arc<G>,
    code_host: Arc<H>,
    remote_retry: RetryPolicy,
}

impl<G, H> Clone for Compensations<G, H> {
    fn clone(&self) -> Self {
        Self {
            project_root: self.project_root.clone(),
            vcs: Arc::clone(&self.vcs),
            code_host: Arc::clone(&self.code_host),
            remote_retry: self.remote_retry,
        }
    }
}

impl<G, H> Compensations<G, H>
where
    G: VersionControl,
    H: CodeHost,
{
    pub fn new(project_root: PathBuf, vcs: Arc<G>, code_host: Arc<H>) -> Self {
        Self {
            project_root,
            vcs,
            code_host,
            remote_retry: RetryPolicy::new(3, Duration::from_secs(1)),
        }
    }

    /// Retry policy for deleting the remote branch.
    #[must_use]
    pub fn with_remote_retry(mut self, policy: RetryPolicy) -> Self {
        self.remote_retry = policy;
        self
    }

    fn root(&self) -> &Path {
        &self.project_root
    }

    /// Deletes a release branch created by this run, locally and, if it was
    /// pushed, on the remote.
    ///
    /// Branches that existed before the run are never touched. If the
    /// branch is checked out, the working tree is first switched to the
    /// first branch that can be checked out among the recorded original
    /// branch, the run's original branch, `main` and `master`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::NoFallbackBranch`] if the branch is checked
    /// out and no other branch can be, or the git error of a failed delete.
    pub fn delete_branch(
        &self,
        cancellation: &Cancellation,
        metadata: &RunMetadata,
        data: &BranchRollback,
    ) -> Result<()> {
        let branch = data.branch_name.as_str();
        if !data.created_in_session {
            info!(branch, "branch existed before this run, keeping it");
            return Ok(());
        }
        cancellation.check()?;

        if self.vcs.current_branch(self.root())? == branch {
            self.switch_away(branch, [
                data.original_branch.as_deref(),
                metadata.original_branch.as_deref(),
            ])?;
        }

        if self.vcs.local_branches(self.root())?.iter().any(|b| b == branch) {
            self.vcs.delete_local_branch(self.root(), branch)?;
            info!(branch, "deleted local branch");
        } else {
            debug!(branch, "local branch already gone");
        }

        if !data.pushed {
            return Ok(());
        }
        cancellation.check()?;

        let on_remote = self
            .vcs
            .remote_branches(self.root())?
            .iter()
            .any(|remote| remote.split_once('/').is_some_and(|(_, name)| name == branch));
        if !on_remote {
            debug!(branch, "remote branch already gone");
            return Ok(());
        }

        self.remote_retry
            .run("delete remote branch", cancellation, |_| {
                match self.vcs.delete_remote_branch(self.root(), branch) {
                    Err(e) if e.is_not_found() => {
                        debug!(branch, "remote branch was deleted concurrently");
                        Ok(())
                    }
                    other => other,
                }
            })?;
        info!(branch, "deleted remote branch");
        Ok(())
    }

    fn switch_away(&self, branch: &str, recorded: [Option<&str>; 2]) -> Result<()> {
        let mut tried = Vec::new();
        let candidates = recorded
            .into_iter()
            .flatten()
            .chain(FALLBACK_BRANCHES)
            .filter(|candidate| !candidate.is_empty() && *candidate != branch);

        for candidate in candidates {
            if tried.contains(&candidate) {
                continue;
            }
            tried.push(candidate);
            match self.vcs.checkout_branch(self.root(), candidate) {
                Ok(()) => {
                    info!(from = branch, to = candidate, "switched branch before deleting");
                    return Ok(());
                }
                Err(error) => debug!(candidate, %error, "cannot check out fallback branch"),
            }
        }

        Err(OperationError::NoFallbackBranch {
            branch: branch.to_string(),
        })
    }

    /// Restores every listed file that has uncommitted changes from HEAD.
    ///
    /// Failures to inspect or restore a single file are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if `cancellation` is interrupted.
    pub fn restore_files(&self, cancellation: &Cancellation, files: &[PathBuf]) -> Result<()> {
        for file in files {
            cancellation.check()?;

            let status = match self.vcs.file_status(self.root(), file) {
                Ok(status) => status,
                Err(error) => {
                    warn!(file = %file.display(), %error, "cannot read file status, leaving it");
                    continue;
                }
            };
            if status.is_clean() {
                debug!(file = %file.display(), "file unchanged");
                continue;
            }

            match self.vcs.restore_file(self.root(), file) {
                Ok(()) => info!(file = %file.display(), "restored file"),
                Err(error) => warn!(file = %file.display(), %error, "failed to restore file"),
            }
        }
        Ok(())
    }

    /// Drops the release commit by resetting to its parent, provided it is
    /// still HEAD.
    ///
    /// # Errors
    ///
    /// Returns an error if HEAD cannot be read or the reset fails.
    pub fn reset_commit(&self, cancellation: &Cancellation, commit_sha: &str) -> Result<()> {
        if commit_sha.is_empty() || commit_sha == "HEAD" {
            debug!("no commit recorded");
            return Ok(());
        }
        cancellation.check()?;

        let head = self.vcs.head_commit(self.root())?;
        if !head.starts_with(commit_sha) {
            info!(
                commit = commit_sha,
                head = %head,
                "release commit is no longer HEAD, leaving history alone"
            );
            return Ok(());
        }

        match self.vcs.reset_hard(self.root(), &format!("{commit_sha}~1")) {
            Ok(()) => {
                info!(commit = commit_sha, "reset release commit");
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                warn!(commit = commit_sha, "release commit has no parent, leaving it");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Closes the release pull request with an explanatory comment.
    ///
    /// Pull requests that are already closed, merged or gone are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lookup or the close fails.
    pub fn close_pull_request(
        &self,
        cancellation: &Cancellation,
        number: Option<u64>,
    ) -> Result<()> {
        let Some(number) = number.filter(|n| *n != 0) else {
            debug!("no pull request recorded");
            return Ok(());
        };
        cancellation.check()?;

        let state = match self.code_host.pr_state(self.root(), number) {
            Ok(state) => state,
            Err(error) if error.is_not_found() => None,
            Err(error) => return Err(error),
        };
        match state {
            Some(PullRequestState::Open) => {}
            Some(state) => {
                info!(number, ?state, "pull request is not open, nothing to close");
                return Ok(());
            }
            None => {
                info!(number, "pull request not found, nothing to close");
                return Ok(());
            }
        }

        if let Err(error) = self.code_host.add_comment(self.root(), number, ROLLBACK_COMMENT) {
            warn!(number, %error, "failed to comment on pull request");
        }

        match self.code_host.close_pr(self.root(), number) {
            Ok(()) => {
                info!(number, "closed pull request");
                Ok(())
            }
            Err(OperationError::PullRequestAlreadyClosed { .. }) => Ok(()),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use pilot_git::FileStatus;

    use super::*;
    use crate::mocks::{MockCodeHost, MockVersionControl, VcsCall};

    const BRANCH: &str = "release/v1.1.0";

    fn compensations(
        vcs: MockVersionControl,
        host: MockCodeHost,
    ) -> (Compensations<MockVersionControl, MockCodeHost>, Arc<MockVersionControl>, Arc<MockCodeHost>) {
        let vcs = Arc::new(vcs);
        let host = Arc::new(host);
        let compensations = Compensations::new(PathBuf::from("/repo"), Arc::clone(&vcs), Arc::clone(&host))
            .with_remote_retry(RetryPolicy::new(3, Duration::ZERO));
        (compensations, vcs, host)
    }

    fn branch(created_in_session: bool, pushed: bool) -> BranchRollback {
        BranchRollback {
            branch_name: BRANCH.to_string(),
            original_branch: Some("main".to_string()),
            created_in_session,
            pushed,
        }
    }

    fn deletes(calls: &[VcsCall]) -> Vec<&VcsCall> {
        calls
            .iter()
            .filter(|c| matches!(c, VcsCall::DeleteLocalBranch(_) | VcsCall::DeleteRemoteBranch(_)))
            .collect()
    }

    #[test]
    fn preexisting_branch_is_kept() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new().with_current_branch(BRANCH).with_remote_branch(BRANCH),
            MockCodeHost::new(),
        );

        comp.delete_branch(&Cancellation::new(), &RunMetadata::default(), &branch(false, true))?;

        assert!(vcs.calls().is_empty());
        assert_eq!(vcs.current(), BRANCH);
        Ok(())
    }

    #[test]
    fn pushed_branch_is_deleted_locally_and_remotely() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new().with_current_branch(BRANCH).with_remote_branch(BRANCH),
            MockCodeHost::new(),
        );

        comp.delete_branch(&Cancellation::new(), &RunMetadata::default(), &branch(true, true))?;

        assert_eq!(vcs.current(), "main");
        assert_eq!(
            deletes(&vcs.calls()),
            vec![
                &VcsCall::DeleteLocalBranch(BRANCH.to_string()),
                &VcsCall::DeleteRemoteBranch(BRANCH.to_string()),
            ]
        );
        assert!(!vcs.remotes().contains(&format!("origin/{BRANCH}")));
        Ok(())
    }

    #[test]
    fn unpushed_branch_is_only_deleted_locally() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new().with_local_branch(BRANCH).with_remote_branch(BRANCH),
            MockCodeHost::new(),
        );

        comp.delete_branch(&Cancellation::new(), &RunMetadata::default(), &branch(true, false))?;

        assert_eq!(
            deletes(&vcs.calls()),
            vec![&VcsCall::DeleteLocalBranch(BRANCH.to_string())]
        );
        Ok(())
    }

    #[test]
    fn falls_back_through_candidate_branches() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new()
                .with_local_branch("develop")
                .with_current_branch(BRANCH),
            MockCodeHost::new(),
        );
        let metadata = RunMetadata {
            original_branch: Some("develop".to_string()),
            ..RunMetadata::default()
        };
        let mut data = branch(true, false);
        data.original_branch = Some("gone".to_string());

        comp.delete_branch(&Cancellation::new(), &metadata, &data)?;

        assert_eq!(vcs.current(), "develop");
        let checkouts: Vec<_> = vcs
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                VcsCall::CheckoutBranch(name) => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(checkouts, vec!["gone".to_string(), "develop".to_string()]);
        Ok(())
    }

    #[test]
    fn no_fallback_branch_is_an_error() {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new()
                .with_current_branch(BRANCH)
                .failing("checkout_branch", usize::MAX),
            MockCodeHost::new(),
        );

        let result = comp.delete_branch(&Cancellation::new(), &RunMetadata::default(), &branch(true, false));

        assert!(matches!(result, Err(OperationError::NoFallbackBranch { .. })));
        assert!(vcs.locals().contains(&BRANCH.to_string()));
    }

    #[test]
    fn remote_delete_is_retried() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new()
                .with_local_branch(BRANCH)
                .with_remote_branch(BRANCH)
                .failing("delete_remote_branch", 2),
            MockCodeHost::new(),
        );

        comp.delete_branch(&Cancellation::new(), &RunMetadata::default(), &branch(true, true))?;

        let attempts = vcs
            .calls()
            .iter()
            .filter(|c| matches!(c, VcsCall::DeleteRemoteBranch(_)))
            .count();
        assert_eq!(attempts, 3);
        Ok(())
    }

    #[test]
    fn branch_delete_is_idempotent() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new().with_current_branch(BRANCH).with_remote_branch(BRANCH),
            MockCodeHost::new(),
        );
        let data = branch(true, true);

        comp.delete_branch(&Cancellation::new(), &RunMetadata::default(), &data)?;
        comp.delete_branch(&Cancellation::new(), &RunMetadata::default(), &data)?;

        assert_eq!(deletes(&vcs.calls()).len(), 2);
        Ok(())
    }

    #[test]
    fn only_changed_files_are_restored() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new()
                .with_file_status("package.json", FileStatus::Modified)
                .with_file_status("Cargo.toml", FileStatus::Clean),
            MockCodeHost::new(),
        );

        comp.restore_files(
            &Cancellation::new(),
            &[PathBuf::from("package.json"), PathBuf::from("Cargo.toml")],
        )?;

        assert_eq!(vcs.calls(), vec![VcsCall::RestoreFile(PathBuf::from("package.json"))]);
        Ok(())
    }

    #[test]
    fn restore_failures_are_not_fatal() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new()
                .with_file_status("CHANGELOG.md", FileStatus::Modified)
                .with_file_status("RELEASE_NOTES.md", FileStatus::Untracked)
                .failing("restore_file", 1),
            MockCodeHost::new(),
        );

        comp.restore_files(
            &Cancellation::new(),
            &[PathBuf::from("CHANGELOG.md"), PathBuf::from("RELEASE_NOTES.md")],
        )?;

        assert_eq!(vcs.calls().len(), 2);
        Ok(())
    }

    #[test]
    fn restore_stops_when_cancelled() {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new().with_file_status("a", FileStatus::Modified),
            MockCodeHost::new(),
        );
        let cancellation = Cancellation::new();
        cancellation.cancel();

        let result = comp.restore_files(&cancellation, &[PathBuf::from("a")]);

        assert!(matches!(result, Err(OperationError::Interrupted(_))));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn commit_at_head_is_reset() -> anyhow::Result<()> {
        let sha = "abc123abc123abc123abc123abc123abc123abcd";
        let (comp, vcs, _) = compensations(MockVersionControl::new().with_head(sha), MockCodeHost::new());

        comp.reset_commit(&Cancellation::new(), sha)?;

        assert_eq!(vcs.calls(), vec![VcsCall::ResetHard(format!("{sha}~1"))]);
        Ok(())
    }

    #[test]
    fn commit_no_longer_at_head_is_kept() -> anyhow::Result<()> {
        let (comp, vcs, _) = compensations(
            MockVersionControl::new().with_head("fff000"),
            MockCodeHost::new(),
        );

        comp.reset_commit(&Cancellation::new(), "abc123")?;
        comp.reset_commit(&Cancellation::new(), "")?;
        comp.reset_commit(&Cancellation::new(), "HEAD")?;

        assert!(vcs.calls().is_empty());
        Ok(())
    }

    #[test]
    fn open_pull_request_is_commented_and_closed() -> anyhow::Result<()> {
        let (comp, _, host) = compensations(
            MockVersionControl::new(),
            MockCodeHost::new().with_pr(7, PullRequestState::Open),
        );

        comp.close_pull_request(&Cancellation::new(), Some(7))?;

        assert_eq!(host.comments(), vec![(7, ROLLBACK_COMMENT.to_string())]);
        assert_eq!(host.closed(), vec![7]);
        assert_eq!(host.state_of(7), Some(PullRequestState::Closed));
        Ok(())
    }

    #[test]
    fn merged_or_missing_pull_requests_are_left_alone() -> anyhow::Result<()> {
        let (comp, _, host) = compensations(
            MockVersionControl::new(),
            MockCodeHost::new().with_pr(3, PullRequestState::Merged),
        );

        comp.close_pull_request(&Cancellation::new(), Some(3))?;
        comp.close_pull_request(&Cancellation::new(), Some(99))?;
        comp.close_pull_request(&Cancellation::new(), Some(0))?;
        comp.close_pull_request(&Cancellation::new(), None)?;

        assert!(host.comments().is_empty());
        assert!(host.closed().is_empty());
        Ok(())
    }

    #[test]
    fn comment_failure_does_not_block_close() -> anyhow::Result<()> {
        let (comp, _, host) = compensations(
            MockVersionControl::new(),
            MockCodeHost::new()
                .with_pr(5, PullRequestState::Open)
                .failing("add_comment", 1),
        );

        comp.close_pull_request(&Cancellation::new(), Some(5))?;

        assert_eq!(host.closed(), vec![5]);
        Ok(())
    }
}
