use std::time::Instant;

use pilot_core::OperationType;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step executed successfully.
    Executed,
    /// Step ran and reported that there was nothing to do.
    Skipped,
    /// Step failed during execution.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
}

/// Record of a step's execution in the saga.
#[derive(Debug)]
pub struct StepRecord {
    /// Name of the step.
    pub name: String,
    pub operation_type: OperationType,
    /// Current status.
    pub status: StepStatus,
    /// When the step started executing (or compensating, for rollback-only
    /// sagas).
    pub started_at: Instant,
    /// When the step completed (execution or compensation).
    pub completed_at: Option<Instant>,
    /// Description of compensation (if applicable).
    pub compensation_description: Option<String>,
}

/// Audit log tracking step executions and compensations of one saga run.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, name: &str, operation_type: OperationType) {
        self.records.push(StepRecord {
            name: name.to_string(),
            operation_type,
            status: StepStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
        });
    }

    /// Mark the last step as failed.
    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Mark the last step as completed.
    pub(crate) fn record_success(&mut self, compensation_description: String, skipped: bool) {
        if let Some(record) = self.records.last_mut() {
            record.status = if skipped {
                StepStatus::Skipped
            } else {
                StepStatus::Executed
            };
            record.completed_at = Some(Instant::now());
            record.compensation_description = Some(compensation_description);
        }
    }

    pub(crate) fn record_compensated(
        &mut self,
        name: &str,
        operation_type: OperationType,
        description: String,
    ) {
        let record = self.find_or_insert(name, operation_type);
        record.status = StepStatus::Compensated;
        record.completed_at = Some(Instant::now());
        record.compensation_description = Some(description);
    }

    pub(crate) fn record_compensation_failed(
        &mut self,
        name: &str,
        operation_type: OperationType,
        description: String,
    ) {
        let record = self.find_or_insert(name, operation_type);
        record.status = StepStatus::CompensationFailed;
        record.completed_at = Some(Instant::now());
        record.compensation_description = Some(description);
    }

    fn find_or_insert(&mut self, name: &str, operation_type: OperationType) -> &mut StepRecord {
        let index = match self
            .records
            .iter()
            .rposition(|record| record.operation_type == operation_type)
        {
            Some(index) => index,
            None => {
                self.records.push(StepRecord {
                    name: name.to_string(),
                    operation_type,
                    status: StepStatus::Executed,
                    started_at: Instant::now(),
                    completed_at: None,
                    compensation_description: None,
                });
                self.records.len() - 1
            }
        };
        &mut self.records[index]
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Records with the given status, in log order.
    pub fn with_status(&self, status: StepStatus) -> impl Iterator<Item = &StepRecord> {
        self.records
            .iter()
            .filter(move |record| record.status == status)
    }

    /// Get a summary of the saga execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "✓",
                StepStatus::Skipped => "-",
                StepStatus::Failed => "✗",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
            };
            lines.push(format!("{status} {}", record.name));
        }
        lines.join("\n")
    }
}
