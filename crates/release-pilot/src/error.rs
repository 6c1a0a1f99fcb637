use pilot_operations::OperationError;
use pilot_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to determine current directory")]
    CurrentDir(#[source] std::io::Error),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CliError {
    /// Step outcomes of a failed release or rollback.
    pub fn audit_summary(&self) -> Option<&str> {
        match self {
            Self::Operation(error) => error.audit_summary(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
