use std::fmt;

use serde::{Deserialize, Serialize};

/// Overall status of a release workflow.
///
/// `Pending -> Running -> {Completed | Failed}`, and `Failed -> RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl WorkflowStatus {
    /// Returns `true` for statuses no further forward progress can leave.
    ///
    /// `Failed` is not terminal here: a later rollback may still move it to
    /// `RolledBack`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Identifies which kind of step an [`OperationRecord`](crate::OperationRecord)
/// describes.
///
/// Records are matched to compensations and to in-memory step definitions
/// through this tag when a persisted run is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CheckChanges,
    CalculateVersion,
    CreateBranch,
    UpdatePackages,
    GenerateChangelog,
    CommitChanges,
    PushBranch,
    CreatePr,
}

impl OperationType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckChanges => "check_changes",
            Self::CalculateVersion => "calculate_version",
            Self::CreateBranch => "create_branch",
            Self::UpdatePackages => "update_packages",
            Self::GenerateChangelog => "generate_changelog",
            Self::CommitChanges => "commit_changes",
            Self::PushBranch => "push_branch",
            Self::CreatePr => "create_pr",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_status_serializes_snake_case() -> anyhow::Result<()> {
        let json = serde_json::to_string(&WorkflowStatus::RolledBack)?;
        assert_eq!(json, "\"rolled_back\"");
        Ok(())
    }

    #[test]
    fn only_completed_and_rolled_back_are_terminal() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::RolledBack.is_terminal());
        assert!(!WorkflowStatus::Failed.is_terminal());
        assert!(!WorkflowStatus::Running.is_terminal());
        assert!(!WorkflowStatus::Pending.is_terminal());
    }

    #[test]
    fn operation_type_display_matches_serialized_tag() -> anyhow::Result<()> {
        for op in [
            OperationType::CheckChanges,
            OperationType::CreatePr,
            OperationType::GenerateChangelog,
        ] {
            let json = serde_json::to_string(&op)?;
            assert_eq!(json, format!("\"{op}\""));
        }
        Ok(())
    }
}
