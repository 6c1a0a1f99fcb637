use std::path::Path;

use pilot_git::{CommitInfo, FileStatus, RemoteAuth, Repository, Signature};

use crate::Result;
use crate::traits::VersionControl;

/// [`VersionControl`] over a local git repository opened with `git2`.
#[derive(Debug, Clone, Default)]
pub struct Git2VersionControl {
    auth: RemoteAuth,
}

impl Git2VersionControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `auth` when talking to `origin`.
    #[must_use]
    pub fn with_auth(auth: RemoteAuth) -> Self {
        Self { auth }
    }

    fn open(&self, project_root: &Path) -> Result<Repository> {
        Ok(Repository::open(project_root)?.with_auth(self.auth.clone()))
    }
}

impl VersionControl for Git2VersionControl {
    fn latest_tag(&self, project_root: &Path) -> Result<Option<String>> {
        let repo = self.open(project_root)?;
        Ok(repo.latest_tag()?.map(|tag| tag.name))
    }

    fn commits_since(&self, project_root: &Path, tag: &str) -> Result<usize> {
        let repo = self.open(project_root)?;
        Ok(repo.commits_since(Some(tag))?)
    }

    fn current_branch(&self, project_root: &Path) -> Result<String> {
        let repo = self.open(project_root)?;
        Ok(repo.current_branch()?)
    }

    fn local_branches(&self, project_root: &Path) -> Result<Vec<String>> {
        let repo = self.open(project_root)?;
        Ok(repo.local_branches()?)
    }

    fn remote_branches(&self, project_root: &Path) -> Result<Vec<String>> {
        let repo = self.open(project_root)?;
        Ok(repo.remote_branches()?)
    }

    fn create_branch(&self, project_root: &Path, name: &str) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.create_branch(name)?)
    }

    fn checkout_branch(&self, project_root: &Path, name: &str) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.checkout_branch(name)?)
    }

    fn push_branch(&self, project_root: &Path, name: &str, force: bool) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.push_branch(name, force)?)
    }

    fn delete_local_branch(&self, project_root: &Path, name: &str) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.delete_local_branch(name)?)
    }

    fn delete_remote_branch(&self, project_root: &Path, name: &str) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.delete_remote_branch(name)?)
    }

    fn stage_files(&self, project_root: &Path, paths: &[&Path]) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.stage_files(paths)?)
    }

    fn commit(
        &self,
        project_root: &Path,
        message: &str,
        author: &Signature,
    ) -> Result<CommitInfo> {
        let repo = self.open(project_root)?;
        Ok(repo.commit(message, Some(author))?)
    }

    fn head_commit(&self, project_root: &Path) -> Result<String> {
        let repo = self.open(project_root)?;
        Ok(repo.head_commit()?)
    }

    fn reset_hard(&self, project_root: &Path, revspec: &str) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.reset_hard(revspec)?)
    }

    fn file_status(&self, project_root: &Path, path: &Path) -> Result<FileStatus> {
        let repo = self.open(project_root)?;
        Ok(repo.file_status(path)?)
    }

    fn restore_file(&self, project_root: &Path, path: &Path) -> Result<()> {
        let repo = self.open(project_root)?;
        Ok(repo.restore_file(path)?)
    }
}
