use std::path::Path;

use crate::Result;

/// Builds release artifacts locally without publishing them.
pub trait SnapshotBuilder: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the build fails.
    fn build_snapshot(&self, project_root: &Path) -> Result<()>;
}
