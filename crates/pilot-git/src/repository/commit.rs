use crate::{CommitInfo, GitError, Result, Signature};

use super::Repository;

impl Repository {
    /// Commits the current index on top of HEAD.
    ///
    /// Without an explicit `signature` the identity from the git config is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit cannot be created.
    pub fn commit(&self, message: &str, signature: Option<&Signature>) -> Result<CommitInfo> {
        let sig = match signature {
            Some(signature) => git2::Signature::now(&signature.name, &signature.email)?,
            None => self.inner.signature()?,
        };
        let mut index = self.inner.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.inner.find_tree(tree_id)?;

        let parent = self.inner.head().ok().and_then(|h| h.peel_to_commit().ok());

        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let commit_oid = self
            .inner
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

        Ok(CommitInfo {
            sha: commit_oid.to_string(),
            message: message.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if HEAD does not point at a commit.
    pub fn head_commit(&self) -> Result<String> {
        let head = self.inner.head()?.peel_to_commit()?;
        Ok(head.id().to_string())
    }

    /// Moves HEAD, the index, and the working tree to `revspec`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::RefNotFound`] if `revspec` does not resolve, for
    /// example `<sha>~1` of a root commit.
    pub fn reset_hard(&self, revspec: &str) -> Result<()> {
        let target = self
            .inner
            .revparse_single(revspec)
            .map_err(|_| GitError::RefNotFound {
                refspec: revspec.to_string(),
            })?;
        let commit = target.peel_to_commit()?;
        self.inner
            .reset(commit.as_object(), git2::ResetType::Hard, None)?;
        Ok(())
    }
}
