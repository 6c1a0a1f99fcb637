use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rollback_data::RollbackData;
use crate::status::{OperationStatus, OperationType, WorkflowStatus};

/// Values shared by every step of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    id: String,
    #[serde(rename = "type")]
    operation_type: OperationType,
    status: OperationStatus,
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rollback_data: Option<RollbackData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl OperationRecord {
    fn pending(operation_type: OperationType, sequence: usize, now: DateTime<Utc>) -> Self {
        Self {
            id: format!(
                "{operation_type}_{sequence}_{}",
                now.format("%Y%m%d%H%M%S")
            ),
            operation_type,
            status: OperationStatus::Pending,
            started_at: now,
            completed_at: None,
            rollback_data: None,
            error: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    #[must_use]
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn rollback_data(&self) -> Option<&RollbackData> {
        self.rollback_data.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Durable record of one release run.
///
/// Operation records are append-only and kept in registration order, which
/// is the order steps execute in. Compensation walks them backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackState {
    session_id: String,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    metadata: RunMetadata,
    status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    operations: Vec<OperationRecord>,
}

impl RollbackState {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            started_at: now,
            updated_at: now,
            metadata: RunMetadata::default(),
            status: WorkflowStatus::Pending,
            error: None,
            operations: Vec::new(),
        }
    }

    /// Creates a state with a freshly generated session identifier.
    #[must_use]
    pub fn with_new_session() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut RunMetadata {
        self.touch();
        &mut self.metadata
    }

    #[must_use]
    pub fn operations(&self) -> &[OperationRecord] {
        &self.operations
    }

    pub fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
        self.touch();
    }

    pub fn add_operation(&mut self, operation_type: OperationType) -> &OperationRecord {
        let now = Utc::now();
        let record = OperationRecord::pending(operation_type, self.operations.len(), now);
        self.operations.push(record);
        self.updated_at = now;
        &self.operations[self.operations.len() - 1]
    }

    /// Moves the first pending record of `operation_type` to running.
    ///
    /// Returns `false` when no record was in the expected prior status.
    pub fn mark_operation_started(&mut self, operation_type: OperationType) -> bool {
        let now = Utc::now();
        let Some(record) = self.find_mut(operation_type, OperationStatus::Pending) else {
            return false;
        };
        record.status = OperationStatus::Running;
        record.started_at = now;
        self.updated_at = now;
        true
    }

    pub fn mark_operation_completed(
        &mut self,
        operation_type: OperationType,
        rollback_data: RollbackData,
    ) -> bool {
        let now = Utc::now();
        let Some(record) = self.find_mut(operation_type, OperationStatus::Running) else {
            return false;
        };
        record.status = OperationStatus::Completed;
        record.completed_at = Some(now);
        record.rollback_data = Some(rollback_data);
        self.updated_at = now;
        true
    }

    /// Marks the running record of `operation_type` as failed.
    ///
    /// The workflow itself is moved to [`WorkflowStatus::Failed`] with the
    /// same error message, even when no matching record was running.
    pub fn mark_operation_failed(
        &mut self,
        operation_type: OperationType,
        error: &impl Display,
    ) -> bool {
        let now = Utc::now();
        let message = error.to_string();
        let transitioned = match self.find_mut(operation_type, OperationStatus::Running) {
            Some(record) => {
                record.status = OperationStatus::Failed;
                record.completed_at = Some(now);
                record.error = Some(message.clone());
                true
            }
            None => false,
        };
        self.status = WorkflowStatus::Failed;
        self.error = Some(message);
        self.updated_at = now;
        transitioned
    }

    /// Completed records, most recently registered first.
    #[must_use]
    pub fn completed_operations(&self) -> Vec<&OperationRecord> {
        self.operations
            .iter()
            .rev()
            .filter(|record| record.status == OperationStatus::Completed)
            .collect()
    }

    #[must_use]
    pub fn last_operation(&self) -> Option<&OperationRecord> {
        self.operations.last()
    }

    #[must_use]
    pub fn operation(&self, operation_type: OperationType) -> Option<&OperationRecord> {
        self.operations
            .iter()
            .find(|record| record.operation_type == operation_type)
    }

    fn find_mut(
        &mut self,
        operation_type: OperationType,
        expected: OperationStatus,
    ) -> Option<&mut OperationRecord> {
        self.operations
            .iter_mut()
            .find(|record| record.operation_type == operation_type && record.status == expected)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
