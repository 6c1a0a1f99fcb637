use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Data a successful step records for its own compensation.
///
/// Persisted as `{"kind": "...", ...}` so every payload keeps its field
/// types across a save/load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollbackData {
    /// Result of a read-only inspection. Nothing to undo.
    Observation {
        has_changes: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        latest_tag: Option<String>,
    },
    Version {
        version: String,
    },
    /// The step decided there was nothing to do.
    Skipped {
        reason: String,
    },
    Branch(BranchRollback),
    Files {
        modified_files: Vec<PathBuf>,
    },
    Commit {
        commit_sha: String,
    },
    PullRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        number: Option<u64>,
    },
}

impl RollbackData {
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Short label used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Observation { .. } => "observation",
            Self::Version { .. } => "version",
            Self::Skipped { .. } => "skipped",
            Self::Branch(_) => "branch",
            Self::Files { .. } => "files",
            Self::Commit { .. } => "commit",
            Self::PullRequest { .. } => "pull_request",
        }
    }
}

/// Everything needed to undo creating or pushing a release branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRollback {
    pub branch_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_branch: Option<String>,
    /// Only branches created by this run are ever deleted.
    pub created_in_session: bool,
    #[serde(default)]
    pub pushed: bool,
}
