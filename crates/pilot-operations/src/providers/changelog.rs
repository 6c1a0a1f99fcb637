use std::path::Path;
use std::process::Command;
use std::time::Duration;

use pilot_core::Cancellation;
use tracing::debug;

use super::command;
use crate::traits::{ChangelogGenerator, ChangelogMode};
use crate::validation::{validate_tag, validate_version};
use crate::{OperationError, Result};

const DEFAULT_PROGRAM: &str = "git-cliff";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ChangelogGenerator`] backed by the `git-cliff` command line tool.
///
/// `git-cliff` reads its own `cliff.toml` from the project root.
#[derive(Debug, Clone)]
pub struct GitCliffChangelog {
    program: String,
    timeout: Duration,
    cancellation: Cancellation,
}

impl GitCliffChangelog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cancellation: Cancellation::new(),
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scope that stops a running command when interrupted.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    fn run(&self, project_root: &Path, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(project_root).args(args);
        let output = command::run(&mut cmd, &self.program, self.timeout, &self.cancellation)?;
        let output = output.trim();
        if output.is_empty() {
            return Err(OperationError::EmptyOutput {
                program: self.program.clone(),
            });
        }
        Ok(output.to_string())
    }
}

impl Default for GitCliffChangelog {
    fn default() -> Self {
        Self::new()
    }
}

fn changelog_args(version: &str, mode: ChangelogMode) -> Vec<&str> {
    match mode {
        ChangelogMode::Unreleased => vec!["--unreleased"],
        ChangelogMode::Release => vec!["--tag", version],
    }
}

impl ChangelogGenerator for GitCliffChangelog {
    fn next_version(&self, project_root: &Path, latest_tag: &str) -> Result<String> {
        validate_tag(latest_tag)?;
        // With --tag, git-cliff echoes the tag back instead of bumping.
        let version = self.run(project_root, &["--bumped-version"])?;
        validate_version(&version)?;
        debug!(latest_tag, %version, "calculated next version");
        Ok(version)
    }

    fn generate(&self, project_root: &Path, version: &str, mode: ChangelogMode) -> Result<String> {
        if !version.is_empty() {
            validate_version(version)?;
        }
        if mode == ChangelogMode::Release && version.is_empty() {
            return Err(OperationError::InvalidVersion {
                version: String::new(),
                reason: "a version is required for a release changelog".to_string(),
            });
        }
        self.run(project_root, &changelog_args(version, mode))
    }

    fn check_config(&self, project_root: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(project_root).args(["--unreleased", "--verbose"]);
        let output = command::run(&mut cmd, &self.program, self.timeout, &self.cancellation)?;
        debug!(lines = output.lines().count(), "git-cliff configuration is valid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreleased_mode_ignores_version() {
        assert_eq!(
            changelog_args("v1.0.0", ChangelogMode::Unreleased),
            vec!["--unreleased"]
        );
    }

    #[test]
    fn release_mode_targets_tag() {
        assert_eq!(
            changelog_args("v1.0.0", ChangelogMode::Release),
            vec!["--tag", "v1.0.0"]
        );
    }

    #[test]
    fn rejects_suspicious_tag_before_running() {
        let cliff = GitCliffChangelog::new().with_program("release-pilot-missing-git-cliff");

        let result = cliff.next_version(Path::new("."), "v1.0.0; rm -rf /");

        assert!(matches!(result, Err(OperationError::InvalidTag { .. })));
    }

    #[test]
    fn release_mode_requires_version() {
        let cliff = GitCliffChangelog::new().with_program("release-pilot-missing-git-cliff");

        let result = cliff.generate(Path::new("."), "", ChangelogMode::Release);

        assert!(matches!(result, Err(OperationError::InvalidVersion { .. })));
    }

    #[test]
    fn cancelled_scope_stops_before_running() {
        let scope = Cancellation::new();
        scope.cancel();
        let cliff = GitCliffChangelog::new()
            .with_program("release-pilot-missing-git-cliff")
            .with_cancellation(scope);

        let result = cliff.generate(Path::new("."), "v1.0.0", ChangelogMode::Unreleased);

        assert!(matches!(result, Err(OperationError::Interrupted(_))));
    }

    #[cfg(unix)]
    #[test]
    fn config_check_accepts_empty_output() {
        let cliff = GitCliffChangelog::new().with_program("true");

        assert!(cliff.check_config(Path::new(".")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn config_check_reports_failure() {
        let cliff = GitCliffChangelog::new().with_program("false");

        let result = cliff.check_config(Path::new("."));

        assert!(matches!(result, Err(OperationError::CommandFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn empty_output_is_an_error() {
        let cliff = GitCliffChangelog::new().with_program("true");

        let result = cliff.generate(Path::new("."), "v1.0.0", ChangelogMode::Unreleased);

        assert!(matches!(result, Err(OperationError::EmptyOutput { .. })));
    }
}
