use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git operation failed")]
    Git(#[from] git2::Error),

    #[error("not a git repository: '{path}'")]
    NotARepository { path: PathBuf },

    #[error("failed to resolve reference '{refspec}'")]
    RefNotFound { refspec: String },

    #[error("branch '{name}' not found")]
    BranchNotFound { name: String },

    #[error("HEAD is detached, not on a branch")]
    DetachedHead,

    #[error("remote '{remote}' is not configured")]
    RemoteNotFound { remote: String },

    #[error("remote rejected update of '{reference}': {message}")]
    PushRejected { reference: String, message: String },

    #[error("file '{path}' does not exist in HEAD")]
    NotInHead { path: PathBuf },
}

impl GitError {
    /// Returns `true` for errors meaning the requested object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Git(error) => error.code() == git2::ErrorCode::NotFound,
            Self::RefNotFound { .. } | Self::BranchNotFound { .. } | Self::NotInHead { .. } => true,
            _ => false,
        }
    }
}
