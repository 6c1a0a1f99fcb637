mod context;
mod operation;
mod steps;

pub use context::{ReleaseContext, ReleaseOptions, WorkflowData};
pub use operation::{ReleaseInput, ReleaseOperation, ReleaseOutput, RollbackOutput};
pub use steps::{
    CalculateVersionStep, CheckChangesStep, CommitChangesStep, CreateBranchStep,
    CreatePullRequestStep, GenerateChangelogStep, PushBranchStep, UpdatePackagesStep,
};

pub const CHANGELOG_FILE: &str = "CHANGELOG.md";
pub const RELEASE_NOTES_FILE: &str = "RELEASE_NOTES.md";
