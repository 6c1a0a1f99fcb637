mod changelog;
mod code_host;
mod command;
mod git;
mod manifest;
mod snapshot;

pub use changelog::GitCliffChangelog;
pub use code_host::{GhCliCodeHost, NoopCodeHost};
pub use git::Git2VersionControl;
pub use manifest::FileSystemManifestUpdater;
pub use snapshot::GoReleaserSnapshot;
