//! Input checks applied before values reach git, the filesystem or a
//! subprocess.

use semver::Version;

use crate::{OperationError, Result};

const MAX_VERSION_LEN: usize = 100;
const MAX_REF_LEN: usize = 255;

fn is_ref_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-')
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.'
}

/// Parses `v?MAJOR.MINOR.PATCH[-pre][+build]`.
///
/// Pre-release and build identifiers are limited to ASCII alphanumerics and
/// dots.
///
/// # Errors
///
/// Returns [`OperationError::InvalidVersion`] describing the first problem.
pub fn validate_version(version: &str) -> Result<Version> {
    let invalid = |reason: &str| OperationError::InvalidVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    };

    if version.is_empty() {
        return Err(invalid("version cannot be empty"));
    }
    if version.len() > MAX_VERSION_LEN {
        return Err(invalid("version is too long"));
    }

    let bare = version.strip_prefix('v').unwrap_or(version);
    let parsed = Version::parse(bare)
        .map_err(|_| invalid("expected MAJOR.MINOR.PATCH with an optional 'v' prefix"))?;

    if !parsed.pre.as_str().chars().all(is_identifier_char)
        || !parsed.build.as_str().chars().all(is_identifier_char)
    {
        return Err(invalid(
            "pre-release and build metadata may only contain letters, digits and dots",
        ));
    }
    Ok(parsed)
}

/// # Errors
///
/// Returns [`OperationError::InvalidBranchName`] describing the first
/// problem.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| OperationError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("branch name cannot be empty"));
    }
    if name.len() > MAX_REF_LEN {
        return Err(invalid("branch name is too long"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid("branch name cannot start or end with '/'"));
    }
    if name.contains("..") {
        return Err(invalid("branch name cannot contain '..'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid("branch name cannot end with '.lock'"));
    }
    if let Some(c) = name.chars().find(|c| !is_ref_char(*c)) {
        return Err(invalid(&format!("branch name contains invalid character '{c}'")));
    }
    Ok(())
}

/// Checks a tag before it is passed to another program. An empty tag means
/// "no tag yet" and is accepted.
///
/// # Errors
///
/// Returns [`OperationError::InvalidTag`] if the tag is too long or contains
/// characters outside `[A-Za-z0-9._/-]` or `..`.
pub fn validate_tag(tag: &str) -> Result<()> {
    let invalid = |reason| OperationError::InvalidTag {
        tag: tag.to_string(),
        reason,
    };

    if tag.len() > MAX_REF_LEN {
        return Err(invalid("tag is too long"));
    }
    if tag.contains("..") {
        return Err(invalid("tag cannot contain '..'"));
    }
    if !tag.chars().all(is_ref_char) {
        return Err(invalid("tag contains invalid characters"));
    }
    Ok(())
}

/// Fails with every name in `names` that `lookup` reports as unset or empty.
///
/// # Errors
///
/// Returns [`OperationError::MissingEnvironment`] listing the missing names.
pub fn require_env(names: &[&str], lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    let missing: Vec<String> = names
        .iter()
        .filter(|name| lookup(name).is_none_or(|value| value.is_empty()))
        .map(|name| (*name).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(OperationError::MissingEnvironment { names: missing })
    }
}
