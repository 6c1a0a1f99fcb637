use pilot_core::{Cancellation, OperationType, RollbackData, RunMetadata};

/// The undo half of a saga step.
///
/// A [`RollbackSaga`](crate::RollbackSaga) only needs this half, which is
/// why it is separate from [`SagaStep`].
///
/// # Type Parameters
///
/// - `Ctx`: Shared dependencies (injected, not passed between steps)
/// - `Err`: The error type for step failures
pub trait Compensate<Ctx, Err>: Send + Sync {
    /// Tag linking this step to its persisted operation record.
    fn operation_type(&self) -> OperationType;

    /// Human-readable name for logging and error messages.
    fn name(&self) -> &'static str;

    /// Undo the effects recorded in `data`.
    ///
    /// Called during rollback, in reverse registration order, for every step
    /// whose record is completed.
    ///
    /// # Idempotency
    ///
    /// This may be invoked more than once for the same record: after a
    /// retried attempt, or when a crashed rollback is re-run from persisted
    /// state. Implementations must inspect live state before acting and
    /// treat "already undone" as success.
    ///
    /// The default implementation is a no-op, suitable for read-only steps.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails.
    fn compensate(
        &self,
        ctx: &Ctx,
        cancellation: &Cancellation,
        metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), Err> {
        let _ = (ctx, cancellation, metadata, data);
        Ok(())
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}

/// A step in a saga that can be executed and compensated.
pub trait SagaStep<Ctx, Err>: Compensate<Ctx, Err> {
    /// Execute the step.
    ///
    /// The step may fill in `metadata` (e.g. the computed version) for later
    /// steps. The returned data is persisted and handed back to
    /// [`Compensate::compensate`] on rollback. Returning
    /// [`RollbackData::Skipped`] marks the step as having changed nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails. The executor retries according to
    /// its [`RetryPolicy`](crate::RetryPolicy).
    fn execute(
        &self,
        ctx: &Ctx,
        cancellation: &Cancellation,
        metadata: &mut RunMetadata,
    ) -> Result<RollbackData, Err>;
}
