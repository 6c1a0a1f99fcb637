mod branch;
mod commit;
mod remote;
mod staging;
mod status;
mod tag;

use std::path::{Path, PathBuf};

use crate::{GitError, RemoteAuth, Result};

const DEFAULT_REMOTE: &str = "origin";

pub struct Repository {
    pub(crate) inner: git2::Repository,
    root: PathBuf,
    remote: String,
    auth: RemoteAuth,
}

impl Repository {
    /// # Errors
    ///
    /// Returns [`GitError::NotARepository`] if the path is not inside a git repository.
    pub fn open(path: &Path) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|_| GitError::NotARepository {
            path: path.to_path_buf(),
        })?;

        let root = inner.workdir().ok_or_else(|| GitError::NotARepository {
            path: path.to_path_buf(),
        })?;

        // Use dunce to get a path without the \\?\ prefix on Windows
        let root = dunce::simplified(root).to_path_buf();

        Ok(Self {
            inner,
            root,
            remote: DEFAULT_REMOTE.to_string(),
            auth: RemoteAuth::default(),
        })
    }

    /// Uses `auth` for every later network operation.
    #[must_use]
    pub fn with_auth(mut self, auth: RemoteAuth) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn remote_name(&self) -> &str {
        &self.remote
    }

    pub(crate) fn to_relative_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            // Use dunce to normalize the path (removes \\?\ prefix on Windows)
            let normalized = dunce::simplified(path);
            normalized
                .strip_prefix(&self.root)
                .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
        } else {
            path.to_path_buf()
        }
    }
}
