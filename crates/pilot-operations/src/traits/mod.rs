mod changelog_generator;
mod code_host;
mod manifest_updater;
mod snapshot_builder;
mod version_control;

pub use changelog_generator::{ChangelogGenerator, ChangelogMode};
pub use code_host::{CodeHost, PullRequest, PullRequestState};
pub use manifest_updater::ManifestUpdater;
pub use snapshot_builder::SnapshotBuilder;
pub use version_control::VersionControl;
