mod cancellation;
mod rollback_data;
mod state;
mod status;

pub use cancellation::{Cancellation, Interrupted};
pub use rollback_data::{BranchRollback, RollbackData};
pub use state::{OperationRecord, RollbackState, RunMetadata};
pub use status::{OperationStatus, OperationType, WorkflowStatus};
