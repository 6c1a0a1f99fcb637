use std::path::PathBuf;
use std::time::Duration;

use pilot_core::Interrupted;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timed out after {timeout:?} waiting for lock on '{path}'")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("interrupted while waiting for lock on '{path}'")]
    Interrupted {
        path: PathBuf,
        #[source]
        source: Interrupted,
    },

    #[error("no saved state for session '{session_id}'")]
    NotFound { session_id: String },

    #[error("no latest state recorded in '{dir}'")]
    NoLatestState { dir: PathBuf },

    #[error("latest state pointer '{path}' names '{target}', which is not a state file")]
    InvalidLatestPointer { path: PathBuf, target: String },

    #[error("state file '{path}' has schema version '{found}', expected '{expected}'")]
    SchemaMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },

    #[error("checksum mismatch in state file '{path}' (expected {expected}, computed {actual})")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("state file '{path}' is corrupted")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid session id '{0}'")]
    InvalidSessionId(String),

    #[error("failed to serialize state for session '{session_id}'")]
    Serialize {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Returns `true` when the file exists but its contents cannot be trusted.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupted { .. } | Self::ChecksumMismatch { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
