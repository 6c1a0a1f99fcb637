use std::path::Path;

use semver::Version;
use serde_json::Value;

use crate::error::ManifestError;

fn read_json(path: &Path) -> Result<(Value, bool), ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_str(&content).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((value, content.ends_with('\n')))
}

fn write_json(path: &Path, value: &Value, trailing_newline: bool) -> Result<(), ManifestError> {
    let mut content = serde_json::to_string_pretty(value).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if trailing_newline {
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn missing(path: &Path, field: &str) -> ManifestError {
    ManifestError::MissingField {
        path: path.to_path_buf(),
        field: field.to_string(),
    }
}

/// # Errors
///
/// Returns `ManifestError::MissingField` if there is no top-level `version`
/// string, or `ManifestError::InvalidVersion` if it is not valid semver.
pub fn read_npm_version(path: &Path) -> Result<Version, ManifestError> {
    let (value, _) = read_json(path)?;
    let version_str = value
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| missing(path, "version"))?;

    Version::parse(version_str).map_err(|source| ManifestError::InvalidVersion {
        path: path.to_path_buf(),
        version: version_str.to_string(),
        source,
    })
}

/// Sets the top-level `version` of a `package.json`, adding it if absent.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a JSON object, or
/// cannot be written.
pub fn write_package_version(path: &Path, version: &Version) -> Result<(), ManifestError> {
    let (mut value, trailing_newline) = read_json(path)?;
    let root = value.as_object_mut().ok_or_else(|| missing(path, "(root object)"))?;
    root.insert("version".to_string(), Value::String(version.to_string()));
    write_json(path, &value, trailing_newline)
}

/// Sets the version of a `package-lock.json`.
///
/// Besides the top-level `version`, lockfiles from npm 7 onwards repeat the
/// root package's version under `packages[""]`; that entry is updated when
/// present.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a JSON object, or
/// cannot be written.
pub fn write_lockfile_version(path: &Path, version: &Version) -> Result<(), ManifestError> {
    let (mut value, trailing_newline) = read_json(path)?;
    let root = value.as_object_mut().ok_or_else(|| missing(path, "(root object)"))?;
    root.insert("version".to_string(), Value::String(version.to_string()));

    if let Some(root_package) = root
        .get_mut("packages")
        .and_then(|packages| packages.get_mut(""))
        .and_then(Value::as_object_mut)
    {
        root_package.insert("version".to_string(), Value::String(version.to_string()));
    }

    write_json(path, &value, trailing_newline)
}
