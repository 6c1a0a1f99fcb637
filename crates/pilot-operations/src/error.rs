use std::path::PathBuf;
use std::time::Duration;

use pilot_core::Interrupted;
use pilot_git::GitError;
use pilot_saga::{CompensationError, SagaError};
use thiserror::Error;

/// Details about the compensation that stopped a rollback.
#[derive(Debug)]
pub struct CompensationFailure {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The error that occurred during compensation.
    pub error: Box<OperationError>,
    /// Completed steps that were left in place.
    pub not_compensated: Vec<String>,
}

impl From<CompensationError<OperationError>> for CompensationFailure {
    fn from(err: CompensationError<OperationError>) -> Self {
        Self {
            step: err.step,
            description: err.description,
            error: Box::new(err.error),
            not_compensated: err.not_compensated,
        }
    }
}

impl std::fmt::Display for CompensationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not {} (step '{}'): {}",
            self.description, self.step, self.error
        )?;
        if !self.not_compensated.is_empty() {
            write!(f, "; not compensated: {}", self.not_compensated.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Manifest(#[from] pilot_manifest::ManifestError),

    #[error(transparent)]
    Store(#[from] pilot_store::StoreError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("failed to read config file '{path}'")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("failed to run '{program}'")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    CommandTimeout { program: String, timeout: Duration },

    #[error("'{program}' returned no output")]
    EmptyOutput { program: String },

    #[error("unexpected output from '{program}': {output}")]
    UnexpectedOutput { program: String, output: String },

    #[error("failed to write '{path}'")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    #[error("missing required environment variables: {}", names.join(", "))]
    MissingEnvironment { names: Vec<String> },

    #[error("potential injection detected in PR body: found '{pattern}'")]
    UnsafePrBody { pattern: &'static str },

    #[error("pull request #{number} was not found")]
    PullRequestNotFound { number: u64 },

    #[error("pull request #{number} is already closed")]
    PullRequestAlreadyClosed { number: u64 },

    #[error("cannot switch away from branch '{branch}': no fallback branch could be checked out")]
    NoFallbackBranch { branch: String },

    #[error("{stage} failed")]
    DryRunStage {
        stage: &'static str,
        #[source]
        source: Box<OperationError>,
    },

    #[error("no version found in branch name '{branch}'")]
    NoVersionInBranch { branch: String },

    #[error("failed to read build metadata '{path}'")]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse build metadata '{path}'")]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to save initial release state")]
    InitialSave(#[source] pilot_store::StoreError),

    #[error("release failed at step '{step}'")]
    SagaFailed {
        step: String,
        #[source]
        source: Box<OperationError>,
        audit: String,
    },

    #[error("release failed at step '{step}' and rollback also failed: {compensation}")]
    SagaRollbackFailed {
        step: String,
        #[source]
        source: Box<OperationError>,
        compensation: CompensationFailure,
        audit: String,
    },

    #[error("rollback failed: {compensation}")]
    RollbackFailed {
        compensation: CompensationFailure,
        audit: String,
    },

    #[error("release workflow failed")]
    Saga {
        #[source]
        source: Box<SagaError<OperationError>>,
        audit: String,
    },
}

pub type Result<T> = std::result::Result<T, OperationError>;

impl OperationError {
    /// Whether the error means the target of the operation is already gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Git(GitError::PushRejected { message, .. }) => {
                let message = message.to_ascii_lowercase();
                message.contains("not found") || message.contains("does not exist")
            }
            Self::Git(error) => error.is_not_found(),
            Self::PullRequestNotFound { .. } => true,
            _ => false,
        }
    }

    /// The step-by-step audit summary of a failed saga, if any.
    #[must_use]
    pub fn audit_summary(&self) -> Option<&str> {
        match self {
            Self::SagaFailed { audit, .. }
            | Self::SagaRollbackFailed { audit, .. }
            | Self::RollbackFailed { audit, .. }
            | Self::Saga { audit, .. } => Some(audit),
            _ => None,
        }
    }

    pub(crate) fn from_saga(err: SagaError<OperationError>, audit: String) -> Self {
        match err {
            SagaError::InitialSave(source) => Self::InitialSave(source),
            SagaError::StepFailed { step, source } => Self::SagaFailed {
                step,
                source: Box::new(source),
                audit,
            },
            SagaError::RollbackFailed {
                step,
                step_error,
                rollback,
            } => Self::SagaRollbackFailed {
                step,
                source: Box::new(step_error),
                compensation: rollback.into(),
                audit,
            },
            SagaError::Rollback(rollback) => Self::RollbackFailed {
                compensation: rollback.into(),
                audit,
            },
            other => Self::Saga {
                source: Box::new(other),
                audit,
            },
        }
    }
}

impl From<SagaError<OperationError>> for OperationError {
    fn from(err: SagaError<OperationError>) -> Self {
        Self::from_saga(err, String::new())
    }
}
