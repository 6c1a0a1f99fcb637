use std::path::{Path, PathBuf};

use semver::Version;
use tracing::debug;

use crate::Result;
use crate::traits::ManifestUpdater;

/// Updates `package.json`, `package-lock.json`, and `Cargo.toml` at the
/// project root.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemManifestUpdater;

impl FileSystemManifestUpdater {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ManifestUpdater for FileSystemManifestUpdater {
    fn update_versions(&self, project_root: &Path, version: &Version) -> Result<Vec<PathBuf>> {
        let changed = pilot_manifest::update_versions(project_root, version)?;
        debug!(%version, files = ?changed, "updated package manifests");
        Ok(changed)
    }
}
