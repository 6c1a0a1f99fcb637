//! Pre-merge checks for a release pull request.
//!
//! Validates the changelog configuration, builds a snapshot release, reads
//! the version from the release branch name and, inside GitHub Actions,
//! reports the result on the pull request.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use pilot_core::Cancellation;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::PilotConfig;
use crate::pr_body::render_dry_run_comment;
use crate::traits::{ChangelogGenerator, CodeHost, SnapshotBuilder, VersionControl};
use crate::{OperationError, Result};

/// Build metadata written by the snapshot build, relative to the project root.
pub const METADATA_FILE: &str = "dist/metadata.json";

const ARCHIVE_ARTIFACT: &str = "Archive";
const EVENT_PATH_MARKERS: [&str; 4] = ["/_temp/", "/workflow/", "/_github_workflow/", "/runner/"];
const SHORT_SHA_LEN: usize = 7;

static BRANCH_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?\d+\.\d+\.\d+").expect("branch version pattern is valid"));

/// The parts of a GitHub Actions environment the dry run looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiEnvironment {
    /// `GITHUB_ACTIONS` is `true`.
    pub github_actions: bool,
    /// `GITHUB_HEAD_REF`: source branch of the pull request.
    pub head_ref: Option<String>,
    /// `GITHUB_SHA`: commit under test.
    pub sha: Option<String>,
    /// `GITHUB_ISSUE_NUMBER`: explicit pull request number.
    pub issue_number: Option<String>,
    /// `GITHUB_EVENT_PATH`: webhook payload of the triggering event.
    pub event_path: Option<PathBuf>,
}

#[derive(Deserialize)]
struct EventPayload {
    pull_request: Option<Numbered>,
    issue: Option<Numbered>,
}

#[derive(Deserialize)]
struct Numbered {
    number: Option<u64>,
}

impl CiEnvironment {
    /// Reads the variables through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self {
            github_actions: var("GITHUB_ACTIONS").is_some_and(|value| value == "true"),
            head_ref: var("GITHUB_HEAD_REF"),
            sha: var("GITHUB_SHA"),
            issue_number: var("GITHUB_ISSUE_NUMBER"),
            event_path: var("GITHUB_EVENT_PATH").map(PathBuf::from),
        }
    }

    /// The pull request under test: `GITHUB_ISSUE_NUMBER` if it parses,
    /// otherwise `pull_request.number` or `issue.number` from the event
    /// payload.
    #[must_use]
    pub fn pull_request_number(&self) -> Option<u64> {
        let explicit = self
            .issue_number
            .as_deref()
            .and_then(|number| number.trim().parse::<u64>().ok())
            .filter(|number| *number != 0);
        if explicit.is_some() {
            return explicit;
        }

        let path = self.event_path.as_deref()?;
        if !is_event_path(path) {
            warn!(path = %path.display(), "ignoring unexpected event payload path");
            return None;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                warn!(path = %path.display(), %error, "cannot read event payload");
                return None;
            }
        };
        let payload: EventPayload = match serde_json::from_str(&content) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(path = %path.display(), %error, "cannot parse event payload");
                return None;
            }
        };
        payload
            .pull_request
            .and_then(|pr| pr.number)
            .or_else(|| payload.issue.and_then(|issue| issue.number))
            .filter(|number| *number != 0)
    }

    fn short_sha(&self) -> &str {
        match self.sha.as_deref() {
            Some(sha) => sha.get(..SHORT_SHA_LEN).unwrap_or(sha),
            None => "unknown",
        }
    }
}

/// Payload files live in the runner's temp or workflow directories.
fn is_event_path(path: &Path) -> bool {
    if !path.is_absolute()
        || path.extension().is_none_or(|ext| ext != "json")
        || path.components().any(|c| c == Component::ParentDir)
    {
        return false;
    }
    let path = path.to_string_lossy();
    EVENT_PATH_MARKERS
        .iter()
        .any(|marker| path.contains(marker))
}

/// The `x.y.z` version embedded in a release branch name, without `v`.
///
/// # Errors
///
/// Returns [`OperationError::NoVersionInBranch`] if the name holds no version.
pub fn version_from_branch(branch: &str) -> Result<String> {
    BRANCH_VERSION
        .find(branch)
        .map(|found| found.as_str().trim_start_matches('v').to_string())
        .ok_or_else(|| OperationError::NoVersionInBranch {
            branch: branch.to_string(),
        })
}

#[derive(Debug, Default, Deserialize)]
struct BuildMetadata {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    goos: Option<String>,
    #[serde(default)]
    goarch: Option<String>,
}

impl BuildMetadata {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            OperationError::MetadataRead {
                path: path.to_path_buf(),
                source,
            }
        })?;
        serde_json::from_str(&content).map_err(|source| OperationError::MetadataParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Sorted, distinct `os/arch` pairs of the built archives.
    fn platforms(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .filter(|artifact| artifact.kind == ARCHIVE_ARTIFACT)
            .filter_map(|artifact| match (&artifact.goos, &artifact.goarch) {
                (Some(os), Some(arch)) => Some(format!("{os}/{arch}")),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// What happened to the pull request report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    Posted { number: u64 },
    /// Inside CI, but no pull request number could be found.
    NoPullRequest,
    /// Not running in GitHub Actions; review is left to a person.
    NotInCi,
}

impl CommentOutcome {
    #[must_use]
    pub fn pr_number(self) -> Option<u64> {
        match self {
            Self::Posted { number } => Some(number),
            Self::NoPullRequest | Self::NotInCi => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunOutput {
    /// Version from the release branch name, without `v`.
    pub version: String,
    pub branch: String,
    pub comment: CommentOutcome,
}

pub struct DryRunOperation<G, H, C, S> {
    project_root: PathBuf,
    vcs: G,
    code_host: H,
    changelog: C,
    builder: S,
    config: PilotConfig,
    cancellation: Cancellation,
}

#[cfg(test)]
impl<G, H, C, S> DryRunOperation<G, H, C, S> {
    pub(crate) fn code_host(&self) -> &H {
        &self.code_host
    }

    pub(crate) fn builder(&self) -> &S {
        &self.builder
    }
}

impl<G, H, C, S> DryRunOperation<G, H, C, S>
where
    G: VersionControl,
    H: CodeHost,
    C: ChangelogGenerator,
    S: SnapshotBuilder,
{
    pub fn new(
        project_root: PathBuf,
        vcs: G,
        code_host: H,
        changelog: C,
        builder: S,
        config: PilotConfig,
    ) -> Self {
        Self {
            project_root,
            vcs,
            code_host,
            changelog,
            builder,
            config,
            cancellation: Cancellation::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Runs the checks in order and stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::DryRunStage`] naming the stage that failed,
    /// [`OperationError::NoVersionInBranch`], or the interruption when the
    /// workflow timeout passes between stages.
    pub fn execute(&self, ci: &CiEnvironment) -> Result<DryRunOutput> {
        let scope = self.cancellation.with_timeout(self.config.workflow_timeout());
        let root = self.project_root.as_path();

        scope.check()?;
        info!("validating changelog generation");
        self.changelog
            .check_config(root)
            .map_err(stage("changelog validation"))?;

        scope.check()?;
        info!("running snapshot build");
        self.builder
            .build_snapshot(root)
            .map_err(stage("snapshot build"))?;

        scope.check()?;
        let branch = match &ci.head_ref {
            Some(head_ref) => head_ref.clone(),
            None => self.vcs.current_branch(root)?,
        };
        let version = version_from_branch(&branch)?;
        info!(%version, branch, "detected release version");

        let comment = if ci.github_actions {
            scope.check()?;
            self.report(ci, &version)
                .map_err(stage("pull request comment"))?
        } else {
            debug!("not running in GitHub Actions, skipping pull request comment");
            CommentOutcome::NotInCi
        };

        Ok(DryRunOutput {
            version,
            branch,
            comment,
        })
    }

    fn report(&self, ci: &CiEnvironment, version: &str) -> Result<CommentOutcome> {
        let Some(number) = ci.pull_request_number() else {
            info!("no pull request number found, skipping comment");
            return Ok(CommentOutcome::NoPullRequest);
        };

        let metadata = BuildMetadata::load(&self.project_root.join(METADATA_FILE))?;
        let body = render_dry_run_comment(
            metadata.version.as_deref().unwrap_or(version),
            ci.short_sha(),
            &metadata.platforms(),
        )?;
        self.code_host.add_comment(&self.project_root, number, &body)?;
        info!(number, "posted dry-run report");
        Ok(CommentOutcome::Posted { number })
    }
}

fn stage(stage: &'static str) -> impl FnOnce(OperationError) -> OperationError {
    move |source| OperationError::DryRunStage {
        stage,
        source: Box::new(source),
    }
}
