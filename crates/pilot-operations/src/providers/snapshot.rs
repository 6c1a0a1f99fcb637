use std::path::Path;
use std::process::Command;
use std::time::Duration;

use pilot_core::Cancellation;
use tracing::info;

use super::command;
use crate::Result;
use crate::traits::SnapshotBuilder;

const DEFAULT_PROGRAM: &str = "goreleaser";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const SNAPSHOT_ARGS: [&str; 4] = ["release", "--snapshot", "--skip=publish", "--clean"];

/// [`SnapshotBuilder`] running a GoReleaser snapshot release.
///
/// Artifacts and `dist/metadata.json` are written to `dist/`.
#[derive(Debug, Clone)]
pub struct GoReleaserSnapshot {
    program: String,
    timeout: Duration,
    cancellation: Cancellation,
}

impl GoReleaserSnapshot {
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

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }
}

impl Default for GoReleaserSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder for GoReleaserSnapshot {
    fn build_snapshot(&self, project_root: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(project_root).args(SNAPSHOT_ARGS);
        command::run(&mut cmd, &self.program, self.timeout, &self.cancellation)?;
        info!("snapshot build completed");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::OperationError;

    #[test]
    fn successful_build_is_ok() {
        let builder = GoReleaserSnapshot::new().with_program("true");

        assert!(builder.build_snapshot(Path::new(".")).is_ok());
    }

    #[test]
    fn failed_build_is_reported() {
        let builder = GoReleaserSnapshot::new().with_program("false");

        let result = builder.build_snapshot(Path::new("."));

        assert!(matches!(result, Err(OperationError::CommandFailed { .. })));
    }
}
