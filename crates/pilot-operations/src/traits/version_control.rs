use std::path::Path;

use pilot_git::{CommitInfo, FileStatus, Signature};

use crate::Result;

pub trait VersionControl: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened or tags cannot be read.
    fn latest_tag(&self, project_root: &Path) -> Result<Option<String>>;

    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened or the tag does not resolve.
    fn commits_since(&self, project_root: &Path, tag: &str) -> Result<usize>;

    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened or HEAD is detached.
    fn current_branch(&self, project_root: &Path) -> Result<String>;

    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened.
    fn local_branches(&self, project_root: &Path) -> Result<Vec<String>>;

    /// Branches on the remote, as `<remote>/<branch>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cannot be reached.
    fn remote_branches(&self, project_root: &Path) -> Result<Vec<String>>;

    /// # Errors
    ///
    /// Returns an error if the branch already exists.
    fn create_branch(&self, project_root: &Path, name: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the branch does not exist or local changes conflict.
    fn checkout_branch(&self, project_root: &Path, name: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the remote rejects the push.
    fn push_branch(&self, project_root: &Path, name: &str, force: bool) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the branch is missing or checked out.
    fn delete_local_branch(&self, project_root: &Path, name: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the remote rejects the deletion.
    fn delete_remote_branch(&self, project_root: &Path, name: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if staging any of the files fails.
    fn stage_files(&self, project_root: &Path, paths: &[&Path]) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the commit cannot be created.
    fn commit(&self, project_root: &Path, message: &str, author: &Signature)
    -> Result<CommitInfo>;

    /// # Errors
    ///
    /// Returns an error if HEAD does not point at a commit.
    fn head_commit(&self, project_root: &Path) -> Result<String>;

    /// # Errors
    ///
    /// Returns an error if `revspec` does not resolve.
    fn reset_hard(&self, project_root: &Path, revspec: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    fn file_status(&self, project_root: &Path, path: &Path) -> Result<FileStatus>;

    /// # Errors
    ///
    /// Returns an error if the file cannot be restored from HEAD.
    fn restore_file(&self, project_root: &Path, path: &Path) -> Result<()>;
}
