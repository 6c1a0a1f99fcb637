use std::path::{Path, PathBuf};

use semver::Version;

use crate::Result;

pub trait ManifestUpdater: Send + Sync {
    /// Writes `version` into every package manifest under `project_root`.
    ///
    /// Returns the changed files, relative to `project_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if a manifest cannot be read, parsed, or written.
    fn update_versions(&self, project_root: &Path, version: &Version) -> Result<Vec<PathBuf>>;
}
