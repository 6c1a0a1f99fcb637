use std::path::Path;

use semver::Version;
use toml_edit::{DocumentMut, Item, value};

use crate::error::ManifestError;

/// # Errors
///
/// Returns `ManifestError::Read` if the file cannot be read, or
/// `ManifestError::Parse` if the TOML is malformed.
pub fn read_document(path: &Path) -> Result<DocumentMut, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .parse::<DocumentMut>()
        .map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads `[package].version`, falling back to `[workspace.package].version`
/// when the package inherits it or there is no package.
///
/// # Errors
///
/// Returns `ManifestError::MissingField` if neither version is present, or
/// `ManifestError::InvalidVersion` if it is not valid semver.
pub fn read_cargo_version(path: &Path) -> Result<Version, ManifestError> {
    let doc = read_document(path)?;

    let version_str = package_version(&doc)
        .or_else(|| workspace_version(&doc))
        .ok_or_else(|| ManifestError::MissingField {
            path: path.to_path_buf(),
            field: "package.version".to_string(),
        })?;

    Version::parse(version_str).map_err(|source| ManifestError::InvalidVersion {
        path: path.to_path_buf(),
        version: version_str.to_string(),
        source,
    })
}

/// Sets every literal release version in a Cargo manifest.
///
/// `[package].version` is replaced only when it is a plain string; an
/// inherited `version.workspace = true` is left alone and
/// `[workspace.package].version` is updated instead, if present. Returns
/// `false` without touching the file when there was nothing to update.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read, parsed, or written.
pub fn write_cargo_version(path: &Path, version: &Version) -> Result<bool, ManifestError> {
    let mut doc = read_document(path)?;
    let mut changed = false;

    if package_version(&doc).is_some()
        && let Some(package) = doc.get_mut("package").and_then(Item::as_table_like_mut)
    {
        package.insert("version", value(version.to_string()));
        changed = true;
    }

    if workspace_version(&doc).is_some()
        && let Some(package) = doc
            .get_mut("workspace")
            .and_then(|workspace| workspace.get_mut("package"))
            .and_then(Item::as_table_like_mut)
    {
        package.insert("version", value(version.to_string()));
        changed = true;
    }

    if !changed {
        return Ok(false);
    }

    std::fs::write(path, doc.to_string()).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

fn package_version(doc: &DocumentMut) -> Option<&str> {
    doc.get("package")?.get("version")?.as_str()
}

fn workspace_version(doc: &DocumentMut) -> Option<&str> {
    doc.get("workspace")?.get("package")?.get("version")?.as_str()
}
