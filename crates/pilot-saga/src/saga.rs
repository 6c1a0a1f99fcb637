use std::fmt::{Debug, Display};
use std::sync::Arc;

use pilot_core::{Cancellation, Interrupted, RollbackState, WorkflowStatus};
use pilot_store::StateRepository;
use tracing::{debug, info, warn};

use crate::audit::SagaAuditLog;
use crate::compensator::Compensator;
use crate::config::SagaConfig;
use crate::error::{CompensationError, SagaError};
use crate::persistence::Persistence;
use crate::step::{Compensate, SagaStep};

/// A saga that runs its steps forward and rolls back on failure.
///
/// Every registered step gets a pending operation record in the saga's
/// [`RollbackState`]. With rollback enabled, the state is persisted before
/// the first step, after each transition, and at the end.
pub struct Saga<Ctx, Err> {
    state: RollbackState,
    steps: Vec<Box<dyn SagaStep<Ctx, Err>>>,
    config: SagaConfig,
    persistence: Persistence,
    audit: SagaAuditLog,
}

impl<Ctx, Err> Saga<Ctx, Err>
where
    Err: From<Interrupted> + Display + Debug,
{
    /// Creates an empty saga with a fresh session id.
    #[must_use]
    pub fn new(config: SagaConfig, repository: Arc<dyn StateRepository>) -> Self {
        Self::with_state(RollbackState::with_new_session(), config, repository)
    }

    /// Creates a saga around an existing state.
    ///
    /// Steps added afterwards append new records to it.
    #[must_use]
    pub fn with_state(
        state: RollbackState,
        config: SagaConfig,
        repository: Arc<dyn StateRepository>,
    ) -> Self {
        let persistence = Persistence::new(repository, config.enable_rollback);
        Self {
            state,
            steps: Vec::new(),
            config,
            persistence,
            audit: SagaAuditLog::new(),
        }
    }

    /// Appends a step and its pending operation record.
    pub fn add_step(&mut self, step: impl SagaStep<Ctx, Err> + 'static) -> &mut Self {
        self.state.add_operation(step.operation_type());
        self.steps.push(Box::new(step));
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
    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    #[must_use]
    pub fn audit(&self) -> &SagaAuditLog {
        &self.audit
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.state.metadata_mut().version = Some(version.into());
    }

    pub fn set_branch_name(&mut self, branch_name: impl Into<String>) {
        self.state.metadata_mut().branch_name = Some(branch_name.into());
    }

    pub fn set_original_branch(&mut self, original_branch: impl Into<String>) {
        self.state.metadata_mut().original_branch = Some(original_branch.into());
    }

    /// Runs every step in registration order.
    ///
    /// Each step is retried according to [`SagaConfig::retry`]. If a step
    /// still fails and rollback is enabled, the completed steps are
    /// compensated under a scope detached from `cancellation` and bounded by
    /// [`SagaConfig::rollback_timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::InitialSave`] if the first snapshot cannot be
    /// written, [`SagaError::StepFailed`] if a step failed (and rollback, if
    /// enabled, succeeded), and [`SagaError::RollbackFailed`] if the
    /// rollback failed too.
    pub fn execute(
        &mut self,
        ctx: &Ctx,
        cancellation: &Cancellation,
    ) -> Result<(), SagaError<Err>> {
        self.persistence
            .save(cancellation, &self.state)
            .map_err(SagaError::InitialSave)?;

        self.state.set_status(WorkflowStatus::Running);
        self.persistence.save_best_effort(cancellation, &self.state);
        info!(
            session_id = self.state.session_id(),
            steps = self.steps.len(),
            rollback = self.config.enable_rollback,
            "starting saga"
        );

        let mut failure = None;
        for step in &self.steps {
            let name = step.name();
            let operation_type = step.operation_type();

            if !self.state.mark_operation_started(operation_type) {
                debug!(step = name, "no pending record for step");
            }
            self.audit.record_start(name, operation_type);
            self.persistence.save_best_effort(cancellation, &self.state);
            info!(step = name, "executing step");

            let mut metadata = self.state.metadata().clone();
            let result = self.config.retry.run(name, cancellation, |_| {
                step.execute(ctx, cancellation, &mut metadata)
            });
            if &metadata != self.state.metadata() {
                *self.state.metadata_mut() = metadata;
            }

            match result {
                Ok(data) => {
                    self.audit
                        .record_success(step.compensation_description(), data.is_skipped());
                    debug!(step = name, kind = data.kind(), "step completed");
                    self.state.mark_operation_completed(operation_type, data);
                    self.persistence.save_best_effort(cancellation, &self.state);
                }
                Err(error) => {
                    warn!(step = name, %error, "step failed");
                    self.audit.record_failure();
                    self.state.mark_operation_failed(operation_type, &error);
                    self.persistence.save_best_effort(cancellation, &self.state);
                    failure = Some((name, error));
                    break;
                }
            }
        }

        if let Some((step, error)) = failure {
            return Err(self.handle_failure(ctx, step, error));
        }

        self.state.set_status(WorkflowStatus::Completed);
        self.persistence.save_best_effort(cancellation, &self.state);
        info!(session_id = self.state.session_id(), "saga completed");
        Ok(())
    }

    /// Compensates the completed steps of this saga.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Rollback`] naming the compensation that failed.
    pub fn rollback(
        &mut self,
        ctx: &Ctx,
        cancellation: &Cancellation,
    ) -> Result<(), SagaError<Err>> {
        let scope = cancellation.with_timeout(self.config.rollback_timeout);
        self.compensate(ctx, &scope).map_err(SagaError::Rollback)
    }

    fn handle_failure(&mut self, ctx: &Ctx, step: &str, error: Err) -> SagaError<Err> {
        if !self.config.enable_rollback {
            return SagaError::StepFailed {
                step: step.to_string(),
                source: error,
            };
        }

        let scope = Cancellation::detached(self.config.rollback_timeout);
        match self.compensate(ctx, &scope) {
            Ok(()) => SagaError::StepFailed {
                step: step.to_string(),
                source: error,
            },
            Err(rollback) => SagaError::RollbackFailed {
                step: step.to_string(),
                step_error: error,
                rollback,
            },
        }
    }

    fn compensate(
        &mut self,
        ctx: &Ctx,
        scope: &Cancellation,
    ) -> Result<(), CompensationError<Err>> {
        let compensator = Compensator {
            compensations: self
                .steps
                .iter()
                .map(|step| {
                    let compensation: &dyn Compensate<Ctx, Err> = step.as_ref();
                    compensation
                })
                .collect(),
            retry: self.config.retry,
            persistence: &self.persistence,
        };
        compensator.run(ctx, scope, &mut self.state, &mut self.audit)
    }
}
