use std::fmt::Debug;

use pilot_store::StoreError;
use thiserror::Error;

/// Error from a failed compensation operation.
///
/// Rollback stops at the first failing compensation, so the steps listed in
/// `not_compensated` still carry their effects.
#[derive(Debug, Error)]
#[error("compensation failed for step '{step}': {description}")]
pub struct CompensationError<E> {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The underlying error.
    #[source]
    pub error: E,
    /// Completed steps that rollback never reached, in the order they would
    /// have been compensated.
    pub not_compensated: Vec<String>,
}

/// Error from saga execution or rollback.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E: Debug> {
    /// Persistence was requested but the initial snapshot could not be written.
    #[error("failed to save initial workflow state")]
    InitialSave(#[source] StoreError),

    /// A step failed. Either rollback is disabled or every compensation
    /// succeeded.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// The error that caused the step to fail.
        #[source]
        source: E,
    },

    /// A step failed and the automatic rollback failed as well.
    #[error("step '{step}' failed: {step_error}, rollback also failed")]
    RollbackFailed {
        /// Name of the step that originally failed.
        step: String,
        /// The error from the failed step.
        step_error: E,
        /// The compensation that stopped the rollback.
        #[source]
        rollback: CompensationError<E>,
    },

    /// An explicitly requested rollback did not complete.
    #[error("rollback failed")]
    Rollback(#[source] CompensationError<E>),
}

impl<E: Debug> SagaError<E> {
    /// Name of the step whose failure started the rollback, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step, .. } | Self::RollbackFailed { step, .. } => Some(step),
            Self::InitialSave(_) | Self::Rollback(_) => None,
        }
    }

    /// The compensation failure, when rollback did not complete.
    #[must_use]
    pub fn compensation_error(&self) -> Option<&CompensationError<E>> {
        match self {
            Self::RollbackFailed { rollback, .. } | Self::Rollback(rollback) => Some(rollback),
            Self::InitialSave(_) | Self::StepFailed { .. } => None,
        }
    }
}
