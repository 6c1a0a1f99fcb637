use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use pilot_core::{BranchRollback, Cancellation, OperationType, RollbackData, RunMetadata};
use pilot_saga::{Compensate, SagaStep};
use tracing::{debug, info, warn};

use super::context::ReleaseContext;
use super::{CHANGELOG_FILE, RELEASE_NOTES_FILE};
use crate::OperationError;
use crate::pr_body::render_pr_body;
use crate::traits::{
    ChangelogGenerator, ChangelogMode, CodeHost, ManifestUpdater, PullRequest, VersionControl,
};
use crate::validation::{validate_branch_name, validate_version};

type Ctx<G, H, C, M> = ReleaseContext<G, H, C, M>;

fn no_version() -> RollbackData {
    RollbackData::skipped("no version was calculated")
}

fn unexpected_data(step: &str, data: &RollbackData) {
    warn!(step, kind = data.kind(), "unexpected rollback data, nothing to compensate");
}

fn remember_files(ctx_files: &mut Vec<PathBuf>, files: &[PathBuf]) {
    for file in files {
        if !ctx_files.contains(file) {
            ctx_files.push(file.clone());
        }
    }
}

/// Decides whether anything changed since the latest tag.
pub struct CheckChangesStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> CheckChangesStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for CheckChangesStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for CheckChangesStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::CheckChanges
    }

    fn name(&self) -> &'static str {
        "Check Changes"
    }

    fn compensation_description(&self) -> String {
        "nothing (read-only)".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for CheckChangesStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        _metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        let root = ctx.project_root();
        let latest_tag = ctx.vcs().latest_tag(root)?;

        let has_changes = match &latest_tag {
            None => {
                info!("no tags found, everything counts as a change");
                true
            }
            Some(tag) => {
                let commits = ctx.vcs().commits_since(root, tag)?;
                if commits == 0 {
                    false
                } else {
                    let next = ctx.changelog().next_version(root, tag)?;
                    debug!(tag, commits, next = %next, "compared next version with latest tag");
                    next != *tag
                }
            }
        };

        info!(
            has_changes,
            latest_tag = latest_tag.as_deref().unwrap_or(""),
            "checked for changes"
        );
        {
            let mut data = ctx.data();
            data.has_changes = has_changes;
            data.latest_tag.clone_from(&latest_tag);
        }
        Ok(RollbackData::Observation {
            has_changes,
            latest_tag,
        })
    }
}

/// Asks the changelog generator for the next version.
pub struct CalculateVersionStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> CalculateVersionStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for CalculateVersionStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for CalculateVersionStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::CalculateVersion
    }

    fn name(&self) -> &'static str {
        "Calculate Version"
    }

    fn compensation_description(&self) -> String {
        "nothing (read-only)".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for CalculateVersionStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        let (has_changes, latest_tag) = {
            let data = ctx.data();
            (data.has_changes, data.latest_tag.clone())
        };
        if !has_changes && !ctx.options().force {
            info!("no changes since the latest release");
            return Ok(RollbackData::skipped("no changes since the latest tag"));
        }

        let base = latest_tag.unwrap_or_else(|| ctx.settings().initial_version.clone());
        let version = ctx.changelog().next_version(ctx.project_root(), &base)?;
        validate_version(&version)?;

        info!(%version, base = %base, "calculated release version");
        metadata.version = Some(version.clone());
        ctx.data().version = Some(version.clone());
        Ok(RollbackData::Version { version })
    }
}

/// Creates `release/<version>` unless it exists, then checks it out.
pub struct CreateBranchStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> CreateBranchStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for CreateBranchStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for CreateBranchStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::CreateBranch
    }

    fn name(&self) -> &'static str {
        "Create Release Branch"
    }

    fn compensate(
        &self,
        ctx: &Ctx<G, H, C, M>,
        cancellation: &Cancellation,
        metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), OperationError> {
        match data {
            RollbackData::Branch(branch) => {
                ctx.compensations().delete_branch(cancellation, metadata, branch)
            }
            other => {
                unexpected_data(self.name(), other);
                Ok(())
            }
        }
    }

    fn compensation_description(&self) -> String {
        "delete the release branch".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for CreateBranchStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        let Some(version) = ctx.version() else {
            return Ok(no_version());
        };
        let root = ctx.project_root();
        let branch_name = ctx.settings().branch_name(&version);
        validate_branch_name(&branch_name)?;
        metadata.branch_name = Some(branch_name.clone());

        let original_branch = match metadata.original_branch.clone() {
            Some(branch) => branch,
            None => ctx.vcs().current_branch(root)?,
        };

        // A retry after a failed checkout must still own the branch it created.
        let already_created = ctx.data().branch_created;
        let exists = ctx.vcs().local_branches(root)?.contains(&branch_name);
        let created_in_session = already_created || !exists;
        if exists {
            if !already_created {
                info!(branch = %branch_name, "release branch already exists, reusing it");
            }
        } else {
            ctx.vcs().create_branch(root, &branch_name)?;
            info!(branch = %branch_name, "created release branch");
        }
        {
            let mut data = ctx.data();
            data.branch_name = Some(branch_name.clone());
            data.branch_created = created_in_session;
            data.original_branch = Some(original_branch.clone());
        }

        ctx.vcs().checkout_branch(root, &branch_name)?;

        Ok(RollbackData::Branch(BranchRollback {
            branch_name,
            original_branch: Some(original_branch),
            created_in_session,
            pushed: false,
        }))
    }
}

/// Writes the release version into the package manifests.
pub struct UpdatePackagesStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> UpdatePackagesStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for UpdatePackagesStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for UpdatePackagesStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::UpdatePackages
    }

    fn name(&self) -> &'static str {
        "Update Package Versions"
    }

    fn compensate(
        &self,
        ctx: &Ctx<G, H, C, M>,
        cancellation: &Cancellation,
        _metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), OperationError> {
        match data {
            RollbackData::Files { modified_files } => {
                ctx.compensations().restore_files(cancellation, modified_files)
            }
            other => {
                unexpected_data(self.name(), other);
                Ok(())
            }
        }
    }

    fn compensation_description(&self) -> String {
        "restore package manifests".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for UpdatePackagesStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        _metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        let Some(version) = ctx.version() else {
            return Ok(no_version());
        };
        let parsed = validate_version(&version)?;

        let modified_files = ctx.manifests().update_versions(ctx.project_root(), &parsed)?;
        if modified_files.is_empty() {
            info!("no package manifests to update");
        } else {
            info!(count = modified_files.len(), version = %parsed, "updated package versions");
        }

        remember_files(&mut ctx.data().modified_files, &modified_files);
        Ok(RollbackData::Files { modified_files })
    }
}

/// Writes the unreleased changelog to `CHANGELOG.md` and `RELEASE_NOTES.md`.
pub struct GenerateChangelogStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> GenerateChangelogStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for GenerateChangelogStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for GenerateChangelogStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::GenerateChangelog
    }

    fn name(&self) -> &'static str {
        "Generate Changelog"
    }

    fn compensate(
        &self,
        ctx: &Ctx<G, H, C, M>,
        cancellation: &Cancellation,
        _metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), OperationError> {
        match data {
            RollbackData::Files { modified_files } => {
                ctx.compensations().restore_files(cancellation, modified_files)
            }
            other => {
                unexpected_data(self.name(), other);
                Ok(())
            }
        }
    }

    fn compensation_description(&self) -> String {
        "restore changelog files".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for GenerateChangelogStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        _metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        let Some(version) = ctx.version() else {
            return Ok(no_version());
        };
        let root = ctx.project_root();
        let changelog = ctx
            .changelog()
            .generate(root, &version, ChangelogMode::Unreleased)?;

        let modified_files = vec![
            PathBuf::from(CHANGELOG_FILE),
            PathBuf::from(RELEASE_NOTES_FILE),
        ];
        for file in &modified_files {
            let path = root.join(file);
            std::fs::write(&path, &changelog)
                .map_err(|source| OperationError::FileWrite { path, source })?;
        }
        info!(%version, "generated changelog");

        {
            let mut data = ctx.data();
            remember_files(&mut data.modified_files, &modified_files);
            data.changelog = Some(changelog);
        }
        Ok(RollbackData::Files { modified_files })
    }
}

/// Commits the updated manifests and changelog on the release branch.
///
/// `RELEASE_NOTES.md` is left uncommitted for the job that publishes the
/// release.
pub struct CommitChangesStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> CommitChangesStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for CommitChangesStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for CommitChangesStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::CommitChanges
    }

    fn name(&self) -> &'static str {
        "Commit Changes"
    }

    fn compensate(
        &self,
        ctx: &Ctx<G, H, C, M>,
        cancellation: &Cancellation,
        _metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), OperationError> {
        match data {
            RollbackData::Commit { commit_sha } => {
                ctx.compensations().reset_commit(cancellation, commit_sha)
            }
            other => {
                unexpected_data(self.name(), other);
                Ok(())
            }
        }
    }

    fn compensation_description(&self) -> String {
        "reset the release commit".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for CommitChangesStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        _metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        let Some(version) = ctx.version() else {
            return Ok(no_version());
        };
        if ctx.options().dry_run {
            info!("dry run, not committing");
            return Ok(RollbackData::skipped("dry run"));
        }
        let root = ctx.project_root();

        let files: Vec<PathBuf> = ctx
            .data()
            .modified_files
            .iter()
            .filter(|file| file.as_path() != Path::new(RELEASE_NOTES_FILE))
            .cloned()
            .collect();
        let paths: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        ctx.vcs().stage_files(root, &paths)?;

        let message = format!("ci(release): prepare release {version}");
        let commit = ctx
            .vcs()
            .commit(root, &message, &ctx.settings().commit_signature())?;
        info!(sha = %commit.sha, "committed release changes");

        ctx.data().commit_sha = Some(commit.sha.clone());
        Ok(RollbackData::Commit {
            commit_sha: commit.sha,
        })
    }
}

/// Pushes the release branch, force-pushing branches that existed before.
pub struct PushBranchStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> PushBranchStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for PushBranchStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for PushBranchStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::PushBranch
    }

    fn name(&self) -> &'static str {
        "Push Branch"
    }

    fn compensate(
        &self,
        ctx: &Ctx<G, H, C, M>,
        cancellation: &Cancellation,
        metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), OperationError> {
        match data {
            RollbackData::Branch(branch) => {
                ctx.compensations().delete_branch(cancellation, metadata, branch)
            }
            other => {
                unexpected_data(self.name(), other);
                Ok(())
            }
        }
    }

    fn compensation_description(&self) -> String {
        "delete the pushed release branch".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for PushBranchStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        _metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        if ctx.version().is_none() {
            return Ok(no_version());
        }
        if ctx.options().dry_run {
            info!("dry run, not pushing");
            return Ok(RollbackData::skipped("dry run"));
        }
        let data = ctx.snapshot();
        let Some(branch_name) = data.branch_name else {
            return Ok(RollbackData::skipped("no release branch"));
        };

        let force = !data.branch_created;
        ctx.vcs().push_branch(ctx.project_root(), &branch_name, force)?;
        info!(branch = %branch_name, force, "pushed release branch");

        ctx.data().pushed = true;
        Ok(RollbackData::Branch(BranchRollback {
            branch_name,
            original_branch: data.original_branch,
            created_in_session: data.branch_created,
            pushed: true,
        }))
    }
}

/// Opens the release pull request, or updates the open one for the branch.
pub struct CreatePullRequestStep<G, H, C, M> {
    _marker: PhantomData<(G, H, C, M)>,
}

impl<G, H, C, M> CreatePullRequestStep<G, H, C, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<G, H, C, M> Default for CreatePullRequestStep<G, H, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, H, C, M> Compensate<Ctx<G, H, C, M>, OperationError> for CreatePullRequestStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn operation_type(&self) -> OperationType {
        OperationType::CreatePr
    }

    fn name(&self) -> &'static str {
        "Create Pull Request"
    }

    fn compensate(
        &self,
        ctx: &Ctx<G, H, C, M>,
        cancellation: &Cancellation,
        _metadata: &RunMetadata,
        data: &RollbackData,
    ) -> Result<(), OperationError> {
        match data {
            RollbackData::PullRequest { number } => {
                ctx.compensations().close_pull_request(cancellation, *number)
            }
            other => {
                unexpected_data(self.name(), other);
                Ok(())
            }
        }
    }

    fn compensation_description(&self) -> String {
        "close the release pull request".to_string()
    }
}

impl<G, H, C, M> SagaStep<Ctx<G, H, C, M>, OperationError> for CreatePullRequestStep<G, H, C, M>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    M: ManifestUpdater,
{
    fn execute(
        &self,
        ctx: &Ctx<G, H, C, M>,
        _cancellation: &Cancellation,
        _metadata: &mut RunMetadata,
    ) -> Result<RollbackData, OperationError> {
        let Some(version) = ctx.version() else {
            return Ok(no_version());
        };
        let options = ctx.options();
        if options.dry_run || options.skip_pr {
            info!(
                dry_run = options.dry_run,
                skip_pr = options.skip_pr,
                "not opening a pull request"
            );
            return Ok(RollbackData::skipped("pull request disabled"));
        }
        let data = ctx.snapshot();
        let Some(branch_name) = data.branch_name else {
            return Ok(RollbackData::skipped("no release branch"));
        };
        let root = ctx.project_root();

        let changelog = match data.changelog {
            Some(changelog) => changelog,
            None => ctx
                .changelog()
                .generate(root, &version, ChangelogMode::Unreleased)?,
        };
        let body = render_pr_body(&version, &changelog)?;
        let title = format!("ci(release): Release {version}");
        let settings = ctx.settings();
        let pr = PullRequest {
            head: &branch_name,
            base: &settings.base_branch,
            title: &title,
            body: &body,
            labels: &settings.labels,
        };

        let number = ctx.code_host().create_or_update_pr(root, &pr)?;
        let number = (number != 0).then_some(number);
        info!(?number, branch = %branch_name, "release pull request ready");

        ctx.data().pr_number = number;
        Ok(RollbackData::PullRequest { number })
    }
}
