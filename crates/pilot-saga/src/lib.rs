//! Saga executor for multi-step release workflows.
//!
//! Steps run in registration order. Each successful step returns typed
//! [`RollbackData`](pilot_core::RollbackData) that is recorded in the
//! workflow's [`RollbackState`](pilot_core::RollbackState) and persisted
//! through a [`StateRepository`](pilot_store::StateRepository). When a step
//! exhausts its retries, every completed step is compensated in reverse
//! order.
//!
//! Two saga types exist: [`Saga`] runs steps forward and rolls back on
//! failure, while [`RollbackSaga`] is reconstructed from persisted state and
//! can only compensate.

mod audit;
mod compensator;
mod config;
mod error;
mod persistence;
mod retry;
mod rollback_saga;
mod saga;
mod step;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use config::SagaConfig;
pub use error::{CompensationError, SagaError};
pub use retry::RetryPolicy;
pub use rollback_saga::RollbackSaga;
pub use saga::Saga;
pub use step::{Compensate, SagaStep};
