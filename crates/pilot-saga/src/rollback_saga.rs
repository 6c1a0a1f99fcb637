use std::fmt::{Debug, Display};
use std::sync::Arc;

use pilot_core::{Cancellation, Interrupted, RollbackState};
use pilot_store::{StateRepository, StoreError};
use tracing::info;

use crate::audit::SagaAuditLog;
use crate::compensator::Compensator;
use crate::config::SagaConfig;
use crate::error::SagaError;
use crate::persistence::Persistence;
use crate::step::Compensate;

/// A saga reconstructed from persisted state that can only compensate.
///
/// Compensations are not serializable, so callers register them again
/// (matched by [`OperationType`](pilot_core::OperationType)) before calling
/// [`rollback`](Self::rollback). Completed records without a registered
/// compensation are skipped. Progress is always persisted.
pub struct RollbackSaga<Ctx, Err> {
    state: RollbackState,
    compensations: Vec<Box<dyn Compensate<Ctx, Err>>>,
    config: SagaConfig,
    persistence: Persistence,
    audit: SagaAuditLog,
}

impl<Ctx, Err> RollbackSaga<Ctx, Err>
where
    Err: From<Interrupted> + Display + Debug,
{
    #[must_use]
    pub fn from_state(
        state: RollbackState,
        config: SagaConfig,
        repository: Arc<dyn StateRepository>,
    ) -> Self {
        Self {
            state,
            compensations: Vec::new(),
            config: config.with_rollback(true),
            persistence: Persistence::new(repository, true),
            audit: SagaAuditLog::new(),
        }
    }

    /// Loads the state of `session_id` from `repository`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the session cannot be loaded.
    pub fn load(
        repository: Arc<dyn StateRepository>,
        config: SagaConfig,
        cancellation: &Cancellation,
        session_id: &str,
    ) -> Result<Self, StoreError> {
        let state = repository.load(cancellation, session_id)?;
        Ok(Self::from_state(state, config, repository))
    }

    /// Loads the most recently saved session from `repository`.
    ///
    /// # Errors
    ///
    /// Returns the store error if no session was saved or it cannot be loaded.
    pub fn load_latest(
        repository: Arc<dyn StateRepository>,
        config: SagaConfig,
        cancellation: &Cancellation,
    ) -> Result<Self, StoreError> {
        let state = repository.load_latest(cancellation)?;
        Ok(Self::from_state(state, config, repository))
    }

    pub fn register(&mut self, compensation: impl Compensate<Ctx, Err> + 'static) -> &mut Self {
        self.compensations.push(Box::new(compensation));
        self
    }

    #[must_use]
    pub fn state(&self) -> &RollbackState {
        &self.state
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        self.state.session_id()
    }

    #[must_use]
    pub fn audit(&self) -> &SagaAuditLog {
        &self.audit
    }

    /// Compensates every completed operation, newest first.
    ///
    /// Runs under a child of `cancellation` limited to
    /// [`SagaConfig::rollback_timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Rollback`] if a compensation still fails after
    /// retries; rollback stops at that step.
    pub fn rollback(
        &mut self,
        ctx: &Ctx,
        cancellation: &Cancellation,
    ) -> Result<(), SagaError<Err>> {
        info!(
            session_id = self.state.session_id(),
            status = %self.state.status(),
            "rolling back persisted session"
        );
        let scope = cancellation.with_timeout(self.config.rollback_timeout);
        let compensator = Compensator {
            compensations: self.compensations.iter().map(|c| &**c).collect(),
            retry: self.config.retry,
            persistence: &self.persistence,
        };
        compensator
            .run(ctx, &scope, &mut self.state, &mut self.audit)
            .map_err(SagaError::Rollback)
    }
}
