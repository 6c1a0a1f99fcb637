use std::path::Path;

use git2::Status;
use git2::build::CheckoutBuilder;

use crate::{FileStatus, GitError, Result};

use super::Repository;

impl Repository {
    /// # Errors
    ///
    /// Returns [`GitError::DetachedHead`] if HEAD is not on a branch.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;

        if !head.is_branch() {
            return Err(GitError::DetachedHead);
        }

        head.shorthand()
            .map(String::from)
            .ok_or(GitError::DetachedHead)
    }

    /// # Errors
    ///
    /// Returns an error if the git status operation fails.
    pub fn is_working_tree_clean(&self) -> Result<bool> {
        let statuses = self.inner.statuses(Some(
            git2::StatusOptions::new()
                .include_untracked(true)
                .recurse_untracked_dirs(true),
        ))?;

        Ok(statuses.is_empty())
    }

    /// Status of a single path; a path git knows nothing about is clean.
    ///
    /// # Errors
    ///
    /// Returns an error if the git status operation fails.
    pub fn file_status(&self, path: &Path) -> Result<FileStatus> {
        let relative_path = self.to_relative_path(path);
        let status = match self.inner.status_file(&relative_path) {
            Ok(status) => status,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(FileStatus::Clean),
            Err(e) => return Err(e.into()),
        };
        Ok(classify(status))
    }

    /// Discards staged and unstaged changes to `path`, restoring its content
    /// from HEAD.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::NotInHead`] if HEAD has no such file.
    pub fn restore_file(&self, path: &Path) -> Result<()> {
        let relative_path = self.to_relative_path(path);
        let head = self.inner.head()?.peel_to_commit()?;

        if head.tree()?.get_path(&relative_path).is_err() {
            return Err(GitError::NotInHead {
                path: relative_path,
            });
        }

        self.inner
            .reset_default(Some(head.as_object()), [relative_path.as_path()])?;
        self.inner.checkout_head(Some(
            CheckoutBuilder::new()
                .force()
                .update_index(true)
                .path(relative_path.as_path()),
        ))?;
        Ok(())
    }
}

fn classify(status: Status) -> FileStatus {
    if status.is_empty() || status.contains(Status::IGNORED) {
        FileStatus::Clean
    } else if status.is_conflicted() {
        FileStatus::Conflicted
    } else if status.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
        FileStatus::Renamed
    } else if status.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
        FileStatus::Deleted
    } else if status.contains(Status::INDEX_NEW) {
        FileStatus::Added
    } else if status.contains(Status::WT_NEW) {
        FileStatus::Untracked
    } else {
        FileStatus::Modified
    }
}
