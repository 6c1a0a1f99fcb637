use std::path::{Path, PathBuf};

use semver::Version;

use crate::cargo::write_cargo_version;
use crate::error::ManifestError;
use crate::npm::{write_lockfile_version, write_package_version};

/// A manifest format whose release version can be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    PackageJson,
    PackageLock,
    Cargo,
}

impl ManifestKind {
    pub const ALL: [Self; 3] = [Self::PackageJson, Self::PackageLock, Self::Cargo];

    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PackageJson => "package.json",
            Self::PackageLock => "package-lock.json",
            Self::Cargo => "Cargo.toml",
        }
    }

    /// Writes `version` into the manifest at `path`.
    ///
    /// Returns whether the file was changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read, parsed, or written.
    pub fn write_version(self, path: &Path, version: &Version) -> Result<bool, ManifestError> {
        match self {
            Self::PackageJson => write_package_version(path, version).map(|()| true),
            Self::PackageLock => write_lockfile_version(path, version).map(|()| true),
            Self::Cargo => write_cargo_version(path, version),
        }
    }
}

/// Updates every known manifest directly under `root`.
///
/// Missing manifests are skipped. Returns the changed files relative to
/// `root`, in [`ManifestKind::ALL`] order.
///
/// # Errors
///
/// Returns the first manifest error; manifests before it stay updated.
pub fn update_versions(root: &Path, version: &Version) -> Result<Vec<PathBuf>, ManifestError> {
    let mut changed = Vec::new();
    for kind in ManifestKind::ALL {
        let path = root.join(kind.file_name());
        if !path.is_file() {
            continue;
        }
        if kind.write_version(&path, version)? {
            changed.push(PathBuf::from(kind.file_name()));
        }
    }
    Ok(changed)
}
