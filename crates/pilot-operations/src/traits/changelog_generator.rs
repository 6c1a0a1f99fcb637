use std::fmt;
use std::path::Path;

use crate::Result;

/// Which commits a generated changelog covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogMode {
    /// Commits since the latest tag.
    Unreleased,
    /// The section of a tagged release.
    Release,
}

impl fmt::Display for ChangelogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unreleased => "unreleased",
            Self::Release => "release",
        })
    }
}

pub trait ChangelogGenerator: Send + Sync {
    /// The version the next release should get, given the latest tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be determined.
    fn next_version(&self, project_root: &Path, latest_tag: &str) -> Result<String>;

    /// # Errors
    ///
    /// Returns an error if the changelog cannot be generated or is empty.
    fn generate(&self, project_root: &Path, version: &str, mode: ChangelogMode) -> Result<String>;

    /// Checks that the generator's configuration in `project_root` works,
    /// without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator rejects its configuration.
    fn check_config(&self, project_root: &Path) -> Result<()>;
}
