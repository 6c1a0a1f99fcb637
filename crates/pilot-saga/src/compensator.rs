use std::fmt::Display;

use pilot_core::{
    Cancellation, Interrupted, OperationType, RollbackData, RollbackState, WorkflowStatus,
};
use tracing::{debug, error, info, warn};

use crate::audit::SagaAuditLog;
use crate::error::CompensationError;
use crate::persistence::Persistence;
use crate::retry::RetryPolicy;
use crate::step::Compensate;

/// Everything a rollback pass needs besides the state it mutates.
pub(crate) struct Compensator<'a, Ctx, Err> {
    pub compensations: Vec<&'a dyn Compensate<Ctx, Err>>,
    pub retry: RetryPolicy,
    pub persistence: &'a Persistence,
}

impl<Ctx, Err> Compensator<'_, Ctx, Err>
where
    Err: From<Interrupted> + Display,
{
    /// Compensates every completed operation of `state`, newest first.
    ///
    /// Stops at the first compensation that still fails after retries. On
    /// success the workflow is marked rolled back.
    pub(crate) fn run(
        &self,
        ctx: &Ctx,
        cancellation: &Cancellation,
        state: &mut RollbackState,
        audit: &mut SagaAuditLog,
    ) -> Result<(), CompensationError<Err>> {
        let completed: Vec<(OperationType, Option<RollbackData>)> = state
            .completed_operations()
            .into_iter()
            .map(|record| (record.operation_type(), record.rollback_data().cloned()))
            .collect();

        info!(
            session_id = state.session_id(),
            operations = completed.len(),
            "rolling back completed operations"
        );

        for (index, (operation_type, data)) in completed.iter().enumerate() {
            let not_compensated = || {
                completed[index + 1..]
                    .iter()
                    .map(|(op, _)| self.label(*op))
                    .collect::<Vec<_>>()
            };

            if let Err(interrupted) = cancellation.check() {
                error!(%interrupted, operation = %operation_type, "rollback interrupted");
                return Err(CompensationError {
                    step: self.label(*operation_type),
                    description: "rollback interrupted before this step was compensated"
                        .to_string(),
                    error: Err::from(interrupted),
                    not_compensated: not_compensated(),
                });
            }

            let Some(compensation) = self.find(*operation_type) else {
                debug!(operation = %operation_type, "no compensation registered, skipping");
                continue;
            };
            let Some(data) = data else {
                warn!(
                    operation = %operation_type,
                    "completed operation has no rollback data, skipping"
                );
                continue;
            };
            if data.is_skipped() {
                debug!(step = compensation.name(), "step changed nothing, skipping compensation");
                continue;
            }

            let name = compensation.name();
            let description = compensation.compensation_description();
            info!(step = name, %description, "compensating step");

            let metadata = state.metadata().clone();
            let result = self.retry.run(name, cancellation, |_| {
                compensation.compensate(ctx, cancellation, &metadata, data)
            });

            match result {
                Ok(()) => {
                    audit.record_compensated(name, *operation_type, description);
                }
                Err(err) => {
                    error!(step = name, error = %err, "compensation failed, aborting rollback");
                    audit.record_compensation_failed(name, *operation_type, description.clone());
                    return Err(CompensationError {
                        step: name.to_string(),
                        description,
                        error: err,
                        not_compensated: not_compensated(),
                    });
                }
            }

            self.persistence.save_best_effort(cancellation, state);
        }

        state.set_status(WorkflowStatus::RolledBack);
        self.persistence.save_best_effort(cancellation, state);
        info!(session_id = state.session_id(), "rollback completed");
        Ok(())
    }

    fn find(&self, operation_type: OperationType) -> Option<&dyn Compensate<Ctx, Err>> {
        self.compensations
            .iter()
            .copied()
            .find(|compensation| compensation.operation_type() == operation_type)
    }

    fn label(&self, operation_type: OperationType) -> String {
        self.find(operation_type).map_or_else(
            || operation_type.to_string(),
            |compensation| compensation.name().to_string(),
        )
    }
}
