use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::compensation::Compensations;
use crate::config::ReleaseSettings;
use crate::traits::{ChangelogGenerator, CodeHost, ManifestUpdater, VersionControl};

/// Per-run switches from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// Release even when nothing changed since the latest tag.
    pub force: bool,
    /// Prepare files locally without committing, pushing or opening a PR.
    pub dry_run: bool,
    pub skip_pr: bool,
}

/// Values produced by one step and consumed by later ones.
///
/// Rollback never reads this; compensations only see the persisted
/// [`RollbackData`](pilot_core::RollbackData).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowData {
    pub has_changes: bool,
    pub latest_tag: Option<String>,
    pub version: Option<String>,
    pub branch_name: Option<String>,
    pub branch_created: bool,
    pub original_branch: Option<String>,
    pub modified_files: Vec<PathBuf>,
    pub changelog: Option<String>,
    pub commit_sha: Option<String>,
    pub pushed: bool,
    pub pr_number: Option<u64>,
}

pub struct ReleaseContext<G, H, C, M> {
    project_root: PathBuf,
    vcs: Arc<G>,
    code_host: Arc<H>,
    changelog: Arc<C>,
    manifests: Arc<M>,
    compensations: Compensations<G, H>,
    settings: ReleaseSettings,
    options: ReleaseOptions,
    data: Mutex<WorkflowData>,
}

impl<G, H, C, M> ReleaseContext<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_root: PathBuf,
        vcs: Arc<G>,
        code_host: Arc<H>,
        changelog: Arc<C>,
        manifests: Arc<M>,
        compensations: Compensations<G, H>,
        settings: ReleaseSettings,
        options: ReleaseOptions,
    ) -> Self {
        Self {
            project_root,
            vcs,
            code_host,
            changelog,
            manifests,
            compensations,
            settings,
            options,
            data: Mutex::new(WorkflowData::default()),
        }
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub fn vcs(&self) -> &G {
        &self.vcs
    }

    #[must_use]
    pub fn code_host(&self) -> &H {
        &self.code_host
    }

    #[must_use]
    pub fn changelog(&self) -> &C {
        &self.changelog
    }

    #[must_use]
    pub fn manifests(&self) -> &M {
        &self.manifests
    }

    #[must_use]
    pub fn compensations(&self) -> &Compensations<G, H> {
        &self.compensations
    }

    #[must_use]
    pub fn settings(&self) -> &ReleaseSettings {
        &self.settings
    }

    #[must_use]
    pub fn options(&self) -> ReleaseOptions {
        self.options
    }

    /// A poisoned lock still holds the last data written by a step.
    pub fn data(&self) -> MutexGuard<'_, WorkflowData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> WorkflowData {
        self.data().clone()
    }

    /// The version calculated earlier in this run, if any.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.data().version.clone()
    }
}
