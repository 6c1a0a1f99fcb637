use std::path::{Path, PathBuf};
use std::sync::Arc;

use pilot_core::Cancellation;
use pilot_saga::{RetryPolicy, RollbackSaga, Saga};
use pilot_store::StateRepository;
use tracing::info;

use super::context::{ReleaseContext, ReleaseOptions};
use super::steps::{
    CalculateVersionStep, CheckChangesStep, CommitChangesStep, CreateBranchStep,
    CreatePullRequestStep, GenerateChangelogStep, PushBranchStep, UpdatePackagesStep,
};
use crate::Result;
use crate::compensation::Compensations;
use crate::config::PilotConfig;
use crate::error::OperationError;
use crate::traits::{ChangelogGenerator, CodeHost, ManifestUpdater, VersionControl};

const REMOTE_DELETE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseInput {
    pub force: bool,
    pub dry_run: bool,
    pub skip_pr: bool,
    /// Persist progress and compensate completed steps on failure. Also
    /// enabled by `saga.enable_rollback` in the config file.
    pub enable_rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutput {
    pub session_id: String,
    pub has_changes: bool,
    pub latest_tag: Option<String>,
    pub version: Option<String>,
    pub branch_name: Option<String>,
    pub commit_sha: Option<String>,
    pub pushed: bool,
    pub pr_number: Option<u64>,
    pub audit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutput {
    pub session_id: String,
    pub audit: String,
}

pub struct ReleaseOperation<G, H, C, M> {
    project_root: PathBuf,
    vcs: Arc<G>,
    code_host: Arc<H>,
    changelog: Arc<C>,
    manifests: Arc<M>,
    repository: Arc<dyn StateRepository>,
    config: PilotConfig,
    cancellation: Cancellation,
}

#[cfg(test)]
impl<G, H, C, M> ReleaseOperation<G, H, C, M> {
    pub(crate) fn vcs(&self) -> &G {
        &self.vcs
    }

    pub(crate) fn code_host(&self) -> &H {
        &self.code_host
    }
}

impl<G, H, C, M> ReleaseOperation<G, H, C, M>
where
    G: VersionControl + 'static,
    H: CodeHost + 'static,
    C: ChangelogGenerator + 'static,
    M: ManifestUpdater + 'static,
{
    pub fn new(
        project_root: PathBuf,
        vcs: G,
        code_host: H,
        changelog: C,
        manifests: M,
        repository: Arc<dyn StateRepository>,
        config: PilotConfig,
    ) -> Self {
        Self {
            project_root,
            vcs: Arc::new(vcs),
            code_host: Arc::new(code_host),
            changelog: Arc::new(changelog),
            manifests: Arc::new(manifests),
            repository,
            config,
            cancellation: Cancellation::new(),
        }
    }

    /// Scope the operation runs under; cancelling it stops the workflow
    /// between steps and during retries.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Runs the release workflow.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::SagaFailed`] naming the failing step (after
    /// a successful rollback, when enabled), or
    /// [`OperationError::SagaRollbackFailed`] when the rollback failed too.
    pub fn execute(&self, input: &ReleaseInput) -> Result<ReleaseOutput> {
        let saga_config = self
            .config
            .saga_config()
            .with_rollback(input.enable_rollback || self.config.saga.enable_rollback);
        let scope = self.cancellation.with_timeout(self.config.workflow_timeout());
        let ctx = self.context(ReleaseOptions {
            force: input.force,
            dry_run: input.dry_run,
            skip_pr: input.skip_pr,
        });

        let mut saga = Saga::new(saga_config, Arc::clone(&self.repository));
        saga.set_original_branch(self.vcs.current_branch(&self.project_root)?);
        saga.add_step(CheckChangesStep::<G, H, C, M>::new())
            .add_step(CalculateVersionStep::<G, H, C, M>::new())
            .add_step(CreateBranchStep::<G, H, C, M>::new())
            .add_step(UpdatePackagesStep::<G, H, C, M>::new())
            .add_step(GenerateChangelogStep::<G, H, C, M>::new())
            .add_step(CommitChangesStep::<G, H, C, M>::new())
            .add_step(PushBranchStep::<G, H, C, M>::new())
            .add_step(CreatePullRequestStep::<G, H, C, M>::new());

        info!(
            session_id = saga.session_id(),
            rollback = saga.config().enable_rollback,
            dry_run = input.dry_run,
            "starting release workflow"
        );
        let result = saga.execute(&ctx, &scope);
        let audit = saga.audit().summary();
        result.map_err(|err| OperationError::from_saga(err, audit.clone()))?;

        let data = ctx.snapshot();
        Ok(ReleaseOutput {
            session_id: saga.session_id().to_string(),
            has_changes: data.has_changes,
            latest_tag: data.latest_tag,
            version: data.version,
            branch_name: data.branch_name,
            commit_sha: data.commit_sha,
            pushed: data.pushed,
            pr_number: data.pr_number,
            audit,
        })
    }

    /// Compensates a saved session, or the most recent one when
    /// `session_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns a store error if the session cannot be loaded, or
    /// [`OperationError::RollbackFailed`] if a compensation fails.
    pub fn rollback(&self, session_id: Option<&str>) -> Result<RollbackOutput> {
        let saga_config = self.config.saga_config();
        let repository = Arc::clone(&self.repository);
        let mut saga = match session_id {
            Some(id) => RollbackSaga::load(repository, saga_config, &self.cancellation, id)?,
            None => RollbackSaga::load_latest(repository, saga_config, &self.cancellation)?,
        };
        register_compensations(&mut saga);

        let ctx = self.context(ReleaseOptions::default());
        let result = saga.rollback(&ctx, &self.cancellation);
        let audit = saga.audit().summary();
        result.map_err(|err| OperationError::from_saga(err, audit.clone()))?;

        info!(session_id = saga.session_id(), "rollback finished");
        Ok(RollbackOutput {
            session_id: saga.session_id().to_string(),
            audit,
        })
    }

    fn context(&self, options: ReleaseOptions) -> ReleaseContext<G, H, C, M> {
        let remote_retry = RetryPolicy::new(
            REMOTE_DELETE_ATTEMPTS,
            self.config.saga_config().retry.initial_delay,
        );
        let compensations = Compensations::new(
            self.project_root.clone(),
            Arc::clone(&self.vcs),
            Arc::clone(&self.code_host),
        )
        .with_remote_retry(remote_retry);

        ReleaseContext::new(
            self.project_root.clone(),
            Arc::clone(&self.vcs),
            Arc::clone(&self.code_host),
            Arc::clone(&self.changelog),
            Arc::clone(&self.manifests),
            compensations,
            self.config.release.clone(),
            options,
        )
    }
}

fn register_compensations<G, H, C, M>(
    saga: &mut RollbackSaga<ReleaseContext<G, H, C, M>, OperationError>,
) where
    G: VersionControl + 'static,
    H: CodeHost + 'static,
    C: ChangelogGenerator + 'static,
    M: ManifestUpdater + 'static,
{
    saga.register(CheckChangesStep::<G, H, C, M>::new())
        .register(CalculateVersionStep::<G, H, C, M>::new())
        .register(CreateBranchStep::<G, H, C, M>::new())
        .register(UpdatePackagesStep::<G, H, C, M>::new())
        .register(GenerateChangelogStep::<G, H, C, M>::new())
        .register(CommitChangesStep::<G, H, C, M>::new())
        .register(PushBranchStep::<G, H, C, M>::new())
        .register(CreatePullRequestStep::<G, H, C, M>::new());
}
