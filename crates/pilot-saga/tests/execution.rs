//! Integration tests for forward saga execution.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{MemoryRepository, TestContext, TestError, TrackedStep, fast_config};
use pilot_core::{
    Cancellation, OperationStatus, OperationType, RollbackData, RunMetadata, WorkflowStatus,
};
use pilot_saga::{Compensate, Saga, SagaError, SagaStep, StepStatus};

#[test]
fn all_steps_succeed_and_complete_in_order() {
    let ctx = TestContext::default();
    let repository = Arc::new(MemoryRepository::default());
    let mut saga = Saga::new(fast_config(true), repository.clone());
    saga.add_step(TrackedStep::ok("check", OperationType::CheckChanges))
        .add_step(TrackedStep::ok("version", OperationType::CalculateVersion))
        .add_step(TrackedStep::ok("branch", OperationType::CreateBranch));

    saga.execute(&ctx, &Cancellation::new())
        .expect("saga should succeed");

    assert_eq!(saga.state().status(), WorkflowStatus::Completed);
    let order: Vec<_> = saga
        .state()
        .completed_operations()
        .iter()
        .map(|record| record.operation_type())
        .collect();
    assert_eq!(
        order,
        vec![
            OperationType::CreateBranch,
            OperationType::CalculateVersion,
            OperationType::CheckChanges,
        ]
    );
    assert_eq!(
        ctx.entries(),
        vec![
            "execute check attempt 1",
            "execute version attempt 1",
            "execute branch attempt 1",
        ]
    );

    let stored = repository
        .stored(saga.session_id())
        .expect("final state should be persisted");
    assert_eq!(stored.status(), WorkflowStatus::Completed);
}

#[test]
fn add_step_registers_pending_record() {
    let repository = Arc::new(MemoryRepository::default());
    let mut saga: Saga<TestContext, TestError> = Saga::new(fast_config(true), repository);

    saga.add_step(TrackedStep::ok("commit", OperationType::CommitChanges));

    let records = saga.state().operations();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].operation_type(), OperationType::CommitChanges);
    assert_eq!(records[0].status(), OperationStatus::Pending);
}

#[test]
fn transient_failures_are_retried() {
    let ctx = TestContext::default();
    let mut saga = Saga::new(fast_config(true), Arc::new(MemoryRepository::default()));
    saga.add_step(TrackedStep::flaky("push", OperationType::PushBranch, 2));

    saga.execute(&ctx, &Cancellation::new())
        .expect("third attempt should succeed");

    assert_eq!(ctx.entries().len(), 3);
    assert_eq!(saga.state().status(), WorkflowStatus::Completed);
}

#[test]
fn failing_step_is_attempted_up_to_the_retry_bound() {
    let ctx = TestContext::default();
    let step = TrackedStep::failing("push", OperationType::PushBranch);
    let mut saga = Saga::new(fast_config(false), Arc::new(MemoryRepository::default()));
    saga.add_step(step);

    let result = saga.execute(&ctx, &Cancellation::new());

    assert!(matches!(result, Err(SagaError::StepFailed { ref step, .. }) if step == "push"));
    assert_eq!(ctx.entries().len(), 3);
}

#[test]
fn rollback_disabled_fails_fast_without_compensation_or_persistence() {
    let ctx = TestContext::default();
    let repository = Arc::new(MemoryRepository::default());
    let mut saga = Saga::new(fast_config(false), repository.clone());
    saga.add_step(TrackedStep::ok("branch", OperationType::CreateBranch))
        .add_step(TrackedStep::failing("commit", OperationType::CommitChanges))
        .add_step(TrackedStep::ok("push", OperationType::PushBranch));

    let result = saga.execute(&ctx, &Cancellation::new());

    assert!(result.is_err());
    assert!(ctx.entries().iter().all(|entry| !entry.starts_with("compensate")));
    assert!(ctx.entries().iter().all(|entry| !entry.contains("push")));
    assert_eq!(saga.state().status(), WorkflowStatus::Failed);
    assert_eq!(repository.save_count(), 0);
}

#[test]
fn initial_save_failure_is_fatal() {
    let ctx = TestContext::default();
    let mut saga = Saga::new(fast_config(true), Arc::new(MemoryRepository::accepting(0)));
    saga.add_step(TrackedStep::ok("check", OperationType::CheckChanges));

    let result = saga.execute(&ctx, &Cancellation::new());

    assert!(matches!(result, Err(SagaError::InitialSave(_))));
    assert!(ctx.entries().is_empty());
}

#[test]
fn progress_save_failures_do_not_abort_the_workflow() {
    let ctx = TestContext::default();
    let repository = Arc::new(MemoryRepository::accepting(1));
    let mut saga = Saga::new(fast_config(true), repository.clone());
    saga.add_step(TrackedStep::ok("check", OperationType::CheckChanges))
        .add_step(TrackedStep::ok("branch", OperationType::CreateBranch));

    saga.execute(&ctx, &Cancellation::new())
        .expect("best-effort saves must not fail the saga");

    assert_eq!(saga.state().status(), WorkflowStatus::Completed);
    assert!(repository.save_count() > 1);
}

struct VersionStep;

impl Compensate<TestContext, TestError> for VersionStep {
    fn operation_type(&self) -> OperationType {
        OperationType::CalculateVersion
    }

    fn name(&self) -> &'static str {
        "version"
    }
}

impl SagaStep<TestContext, TestError> for VersionStep {
    fn execute(
        &self,
        _ctx: &TestContext,
        _cancellation: &Cancellation,
        metadata: &mut RunMetadata,
    ) -> Result<RollbackData, TestError> {
        metadata.version = Some("v2.0.0".to_string());
        Ok(RollbackData::Version {
            version: "v2.0.0".to_string(),
        })
    }
}

#[test]
fn steps_can_publish_run_metadata() {
    let ctx = TestContext::default();
    let repository = Arc::new(MemoryRepository::default());
    let mut saga = Saga::new(fast_config(true), repository.clone());
    saga.set_original_branch("main");
    saga.add_step(VersionStep);

    saga.execute(&ctx, &Cancellation::new())
        .expect("saga should succeed");

    let stored = repository
        .stored(saga.session_id())
        .expect("state should be persisted");
    assert_eq!(stored.metadata().version.as_deref(), Some("v2.0.0"));
    assert_eq!(stored.metadata().original_branch.as_deref(), Some("main"));
}

#[test]
fn cancelled_caller_stops_before_the_next_step() {
    let ctx = TestContext::default();
    let scope = Cancellation::new();
    scope.cancel();
    let step = TrackedStep::ok("check", OperationType::CheckChanges);
    let mut saga = Saga::new(fast_config(false), Arc::new(MemoryRepository::default()));
    saga.add_step(step);

    let result = saga.execute(&ctx, &scope);

    assert!(matches!(
        result,
        Err(SagaError::StepFailed {
            source: TestError::Interrupted(_),
            ..
        })
    ));
    assert!(ctx.entries().is_empty());
}

#[test]
fn audit_log_tracks_execution() {
    let ctx = TestContext::default();
    let mut saga = Saga::new(fast_config(false), Arc::new(MemoryRepository::default()));
    saga.add_step(TrackedStep::ok("check", OperationType::CheckChanges))
        .add_step(TrackedStep::failing("branch", OperationType::CreateBranch));

    let _ = saga.execute(&ctx, &Cancellation::new());

    let records = saga.audit().records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].status, StepStatus::Executed);
    assert_eq!(records[1].status, StepStatus::Failed);
    assert!(saga.audit().summary().contains("✗ branch"));
}

#[test]
fn attempts_counter_reflects_retries() {
    let ctx = TestContext::default();
    let step = Arc::new(TrackedStep::flaky("push", OperationType::PushBranch, 1));
    let mut saga = Saga::new(fast_config(false), Arc::new(MemoryRepository::default()));
    saga.add_step(SharedStep(Arc::clone(&step)));

    saga.execute(&ctx, &Cancellation::new())
        .expect("second attempt should succeed");

    assert_eq!(step.attempts.load(Ordering::SeqCst), 2);
}

struct SharedStep(Arc<TrackedStep>);

impl Compensate<TestContext, TestError> for SharedStep {
    fn operation_type(&self) -> OperationType {
        self.0.operation_type
    }

    fn name(&self) -> &'static str {
        self.0.name
    }
}

impl SagaStep<TestContext, TestError> for SharedStep {
    fn execute(
        &self,
        ctx: &TestContext,
        cancellation: &Cancellation,
        metadata: &mut RunMetadata,
    ) -> Result<RollbackData, TestError> {
        self.0.execute(ctx, cancellation, metadata)
    }
}
