use git2::BranchType;
use git2::build::CheckoutBuilder;

use crate::{GitError, Result};

use super::Repository;

impl Repository {
    /// # Errors
    ///
    /// Returns an error if the branches cannot be listed.
    pub fn local_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.inner.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// # Errors
    ///
    /// Returns an error if the branch lookup fails for a reason other than absence.
    pub fn branch_exists(&self, name: &str) -> Result<bool> {
        match self.inner.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a local branch pointing at HEAD.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch already exists or HEAD has no commit.
    pub fn create_branch(&self, name: &str) -> Result<()> {
        let head = self.inner.head()?.peel_to_commit()?;
        self.inner.branch(name, &head, false)?;
        Ok(())
    }

    /// Switches the working tree and HEAD to a local branch.
    ///
    /// Uncommitted changes that do not conflict with the target are kept.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::BranchNotFound`] if the branch does not exist, or
    /// an error if the checkout would overwrite local changes.
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{name}");
        let target = self
            .inner
            .revparse_single(&refname)
            .map_err(|_| GitError::BranchNotFound {
                name: name.to_string(),
            })?;

        self.inner
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
        self.inner.set_head(&refname)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GitError::BranchNotFound`] if the branch does not exist, or
    /// an error if it is currently checked out.
    pub fn delete_local_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .inner
            .find_branch(name, BranchType::Local)
            .map_err(|_| GitError::BranchNotFound {
                name: name.to_string(),
            })?;
        branch.delete()?;
        Ok(())
    }
}
