use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pilot_git::{CommitInfo, FileStatus, GitError, Signature};
use semver::Version;

use crate::traits::{
    ChangelogGenerator, ChangelogMode, CodeHost, ManifestUpdater, PullRequest, PullRequestState,
    SnapshotBuilder, VersionControl,
};
use crate::{OperationError, Result};

/// Failures injected per method name. `usize::MAX` fails forever.
#[derive(Default)]
struct Failures(Mutex<HashMap<&'static str, usize>>);

impl Failures {
    fn set(&self, method: &'static str, times: usize) {
        self.0.lock().expect("lock poisoned").insert(method, times);
    }

    fn check(&self, method: &'static str) -> Result<()> {
        let mut failures = self.0.lock().expect("lock poisoned");
        match failures.get_mut(method) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(OperationError::CommandFailed {
                    program: "mock".to_string(),
                    status: "injected failure".to_string(),
                    stderr: method.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    CreateBranch(String),
    CheckoutBranch(String),
    PushBranch { name: String, force: bool },
    DeleteLocalBranch(String),
    DeleteRemoteBranch(String),
    StageFiles(Vec<PathBuf>),
    Commit(String),
    ResetHard(String),
    RestoreFile(PathBuf),
}

struct VcsState {
    latest_tag: Option<String>,
    commits_since: usize,
    current_branch: String,
    local_branches: Vec<String>,
    remote_branches: Vec<String>,
    head: String,
    commit_count: usize,
    file_statuses: HashMap<PathBuf, FileStatus>,
}

/// In-memory [`VersionControl`] that tracks branches, HEAD and file status.
pub struct MockVersionControl {
    state: Mutex<VcsState>,
    calls: Mutex<Vec<VcsCall>>,
    failures: Failures,
}

impl MockVersionControl {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VcsState {
                latest_tag: None,
                commits_since: 0,
                current_branch: "main".to_string(),
                local_branches: vec!["main".to_string()],
                remote_branches: vec!["origin/main".to_string()],
                head: "0000000000000000000000000000000000000000".to_string(),
                commit_count: 0,
                file_statuses: HashMap::new(),
            }),
            calls: Mutex::new(Vec::new()),
            failures: Failures::default(),
        }
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_latest_tag(self, tag: &str, commits_since: usize) -> Self {
        {
            let mut state = self.state.lock().expect("lock poisoned");
            state.latest_tag = Some(tag.to_string());
            state.commits_since = commits_since;
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_current_branch(self, branch: &str) -> Self {
        {
            let mut state = self.state.lock().expect("lock poisoned");
            state.current_branch = branch.to_string();
            if !state.local_branches.iter().any(|b| b == branch) {
                state.local_branches.push(branch.to_string());
            }
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_local_branch(self, branch: &str) -> Self {
        self.state
            .lock()
            .expect("lock poisoned")
            .local_branches
            .push(branch.to_string());
        self
    }

    /// Adds `origin/<branch>` to the remote listing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_remote_branch(self, branch: &str) -> Self {
        self.state
            .lock()
            .expect("lock poisoned")
            .remote_branches
            .push(format!("origin/{branch}"));
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_head(self, sha: &str) -> Self {
        self.state.lock().expect("lock poisoned").head = sha.to_string();
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_file_status(self, path: impl Into<PathBuf>, status: FileStatus) -> Self {
        self.state
            .lock()
            .expect("lock poisoned")
            .file_statuses
            .insert(path.into(), status);
        self
    }

    /// Makes the next `times` calls of `method` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn failing(self, method: &'static str, times: usize) -> Self {
        self.failures.set(method, times);
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn current(&self) -> String {
        self.state.lock().expect("lock poisoned").current_branch.clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn locals(&self) -> Vec<String> {
        self.state.lock().expect("lock poisoned").local_branches.clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn remotes(&self) -> Vec<String> {
        self.state.lock().expect("lock poisoned").remote_branches.clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn head(&self) -> String {
        self.state.lock().expect("lock poisoned").head.clone()
    }

    fn record(&self, call: VcsCall) {
        self.calls.lock().expect("lock poisoned").push(call);
    }

    fn state(&self) -> std::sync::MutexGuard<'_, VcsState> {
        self.state.lock().expect("lock poisoned")
    }
}

impl Default for MockVersionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for MockVersionControl {
    fn latest_tag(&self, _project_root: &Path) -> Result<Option<String>> {
        self.failures.check("latest_tag")?;
        Ok(self.state().latest_tag.clone())
    }

    fn commits_since(&self, _project_root: &Path, _tag: &str) -> Result<usize> {
        self.failures.check("commits_since")?;
        Ok(self.state().commits_since)
    }

    fn current_branch(&self, _project_root: &Path) -> Result<String> {
        self.failures.check("current_branch")?;
        Ok(self.state().current_branch.clone())
    }

    fn local_branches(&self, _project_root: &Path) -> Result<Vec<String>> {
        self.failures.check("local_branches")?;
        Ok(self.state().local_branches.clone())
    }

    fn remote_branches(&self, _project_root: &Path) -> Result<Vec<String>> {
        self.failures.check("remote_branches")?;
        Ok(self.state().remote_branches.clone())
    }

    fn create_branch(&self, _project_root: &Path, name: &str) -> Result<()> {
        self.record(VcsCall::CreateBranch(name.to_string()));
        self.failures.check("create_branch")?;
        self.state().local_branches.push(name.to_string());
        Ok(())
    }

    fn checkout_branch(&self, _project_root: &Path, name: &str) -> Result<()> {
        self.record(VcsCall::CheckoutBranch(name.to_string()));
        self.failures.check("checkout_branch")?;
        let mut state = self.state();
        if !state.local_branches.iter().any(|b| b == name) {
            return Err(GitError::BranchNotFound {
                name: name.to_string(),
            }
            .into());
        }
        state.current_branch = name.to_string();
        Ok(())
    }

    fn push_branch(&self, _project_root: &Path, name: &str, force: bool) -> Result<()> {
        self.record(VcsCall::PushBranch {
            name: name.to_string(),
            force,
        });
        self.failures.check("push_branch")?;
        let remote = format!("origin/{name}");
        let mut state = self.state();
        if !state.remote_branches.contains(&remote) {
            state.remote_branches.push(remote);
        }
        Ok(())
    }

    fn delete_local_branch(&self, _project_root: &Path, name: &str) -> Result<()> {
        self.record(VcsCall::DeleteLocalBranch(name.to_string()));
        self.failures.check("delete_local_branch")?;
        self.state().local_branches.retain(|b| b != name);
        Ok(())
    }

    fn delete_remote_branch(&self, _project_root: &Path, name: &str) -> Result<()> {
        self.record(VcsCall::DeleteRemoteBranch(name.to_string()));
        self.failures.check("delete_remote_branch")?;
        let remote = format!("origin/{name}");
        self.state().remote_branches.retain(|b| *b != remote);
        Ok(())
    }

    fn stage_files(&self, _project_root: &Path, paths: &[&Path]) -> Result<()> {
        self.record(VcsCall::StageFiles(
            paths.iter().map(|p| p.to_path_buf()).collect(),
        ));
        self.failures.check("stage_files")
    }

    fn commit(
        &self,
        _project_root: &Path,
        message: &str,
        _author: &Signature,
    ) -> Result<CommitInfo> {
        self.record(VcsCall::Commit(message.to_string()));
        self.failures.check("commit")?;
        let mut state = self.state();
        state.commit_count += 1;
        state.head = format!("{:040x}", state.commit_count);
        for status in state.file_statuses.values_mut() {
            *status = FileStatus::Clean;
        }
        Ok(CommitInfo {
            sha: state.head.clone(),
            message: message.to_string(),
        })
    }

    fn head_commit(&self, _project_root: &Path) -> Result<String> {
        self.failures.check("head_commit")?;
        Ok(self.state().head.clone())
    }

    fn reset_hard(&self, _project_root: &Path, revspec: &str) -> Result<()> {
        self.record(VcsCall::ResetHard(revspec.to_string()));
        self.failures.check("reset_hard")?;
        self.state().head = revspec.to_string();
        Ok(())
    }

    fn file_status(&self, _project_root: &Path, path: &Path) -> Result<FileStatus> {
        self.failures.check("file_status")?;
        Ok(self
            .state()
            .file_statuses
            .get(path)
            .copied()
            .unwrap_or(FileStatus::Clean))
    }

    fn restore_file(&self, _project_root: &Path, path: &Path) -> Result<()> {
        self.record(VcsCall::RestoreFile(path.to_path_buf()));
        self.failures.check("restore_file")?;
        self.state()
            .file_statuses
            .insert(path.to_path_buf(), FileStatus::Clean);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPullRequest {
    pub number: u64,
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// In-memory [`CodeHost`] keeping pull requests and their states.
pub struct MockCodeHost {
    pull_requests: Mutex<Vec<RecordedPullRequest>>,
    states: Mutex<HashMap<u64, PullRequestState>>,
    comments: Mutex<Vec<(u64, String)>>,
    closed: Mutex<Vec<u64>>,
    next_number: Mutex<u64>,
    failures: Failures,
}

impl MockCodeHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pull_requests: Mutex::new(Vec::new()),
            states: Mutex::new(HashMap::new()),
            comments: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            next_number: Mutex::new(1),
            failures: Failures::default(),
        }
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_pr(self, number: u64, state: PullRequestState) -> Self {
        self.states.lock().expect("lock poisoned").insert(number, state);
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn failing(self, method: &'static str, times: usize) -> Self {
        self.failures.set(method, times);
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn pull_requests(&self) -> Vec<RecordedPullRequest> {
        self.pull_requests.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn closed(&self) -> Vec<u64> {
        self.closed.lock().expect("lock poisoned").clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn state_of(&self, number: u64) -> Option<PullRequestState> {
        self.states.lock().expect("lock poisoned").get(&number).copied()
    }
}

impl Default for MockCodeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeHost for MockCodeHost {
    fn create_or_update_pr(&self, _project_root: &Path, pr: &PullRequest<'_>) -> Result<u64> {
        self.failures.check("create_or_update_pr")?;
        let mut pull_requests = self.pull_requests.lock().expect("lock poisoned");
        let mut states = self.states.lock().expect("lock poisoned");

        let existing = pull_requests
            .iter()
            .position(|p| {
                p.head == pr.head && states.get(&p.number) == Some(&PullRequestState::Open)
            });
        let number = match existing {
            Some(index) => pull_requests.remove(index).number,
            None => {
                let mut next = self.next_number.lock().expect("lock poisoned");
                let number = *next;
                *next += 1;
                number
            }
        };

        states.insert(number, PullRequestState::Open);
        pull_requests.push(RecordedPullRequest {
            number,
            head: pr.head.to_string(),
            base: pr.base.to_string(),
            title: pr.title.to_string(),
            body: pr.body.to_string(),
            labels: pr.labels.to_vec(),
        });
        Ok(number)
    }

    fn add_comment(&self, _project_root: &Path, number: u64, body: &str) -> Result<()> {
        self.failures.check("add_comment")?;
        self.comments
            .lock()
            .expect("lock poisoned")
            .push((number, body.to_string()));
        Ok(())
    }

    fn close_pr(&self, _project_root: &Path, number: u64) -> Result<()> {
        self.failures.check("close_pr")?;
        let mut states = self.states.lock().expect("lock poisoned");
        match states.get(&number) {
            None => Err(OperationError::PullRequestNotFound { number }),
            Some(PullRequestState::Open) => {
                states.insert(number, PullRequestState::Closed);
                self.closed.lock().expect("lock poisoned").push(number);
                Ok(())
            }
            Some(_) => Err(OperationError::PullRequestAlreadyClosed { number }),
        }
    }

    fn pr_state(&self, _project_root: &Path, number: u64) -> Result<Option<PullRequestState>> {
        self.failures.check("pr_state")?;
        Ok(self.states.lock().expect("lock poisoned").get(&number).copied())
    }
}

/// [`ChangelogGenerator`] returning fixed values.
pub struct MockChangelogGenerator {
    next_version: String,
    changelog: String,
    requests: Mutex<Vec<(String, ChangelogMode)>>,
    failures: Failures,
}

impl MockChangelogGenerator {
    #[must_use]
    pub fn new(next_version: &str) -> Self {
        Self {
            next_version: next_version.to_string(),
            changelog: format!("## [{next_version}]\n\n### Features\n\n- add release workflow"),
            requests: Mutex::new(Vec::new()),
            failures: Failures::default(),
        }
    }

    #[must_use]
    pub fn with_changelog(mut self, changelog: &str) -> Self {
        self.changelog = changelog.to_string();
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn failing(self, method: &'static str, times: usize) -> Self {
        self.failures.set(method, times);
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<(String, ChangelogMode)> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

impl ChangelogGenerator for MockChangelogGenerator {
    fn next_version(&self, _project_root: &Path, _latest_tag: &str) -> Result<String> {
        self.failures.check("next_version")?;
        Ok(self.next_version.clone())
    }

    fn generate(&self, _project_root: &Path, version: &str, mode: ChangelogMode) -> Result<String> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push((version.to_string(), mode));
        self.failures.check("generate")?;
        Ok(self.changelog.clone())
    }

    fn check_config(&self, _project_root: &Path) -> Result<()> {
        self.failures.check("check_config")
    }
}

/// [`SnapshotBuilder`] that counts builds.
#[derive(Default)]
pub struct MockSnapshotBuilder {
    builds: Mutex<usize>,
    failures: Failures,
}

impl MockSnapshotBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(self, times: usize) -> Self {
        self.failures.set("build_snapshot", times);
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn builds(&self) -> usize {
        *self.builds.lock().expect("lock poisoned")
    }
}

impl SnapshotBuilder for MockSnapshotBuilder {
    fn build_snapshot(&self, _project_root: &Path) -> Result<()> {
        *self.builds.lock().expect("lock poisoned") += 1;
        self.failures.check("build_snapshot")
    }
}

/// [`ManifestUpdater`] that reports a fixed set of modified files.
pub struct MockManifestUpdater {
    files: Vec<PathBuf>,
    versions: Mutex<Vec<Version>>,
    failures: Failures,
}

impl MockManifestUpdater {
    #[must_use]
    pub fn new(files: &[&str]) -> Self {
        Self {
            files: files.iter().map(PathBuf::from).collect(),
            versions: Mutex::new(Vec::new()),
            failures: Failures::default(),
        }
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn failing(self, times: usize) -> Self {
        self.failures.set("update_versions", times);
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn versions(&self) -> Vec<Version> {
        self.versions.lock().expect("lock poisoned").clone()
    }
}

impl ManifestUpdater for MockManifestUpdater {
    fn update_versions(&self, _project_root: &Path, version: &Version) -> Result<Vec<PathBuf>> {
        self.failures.check("update_versions")?;
        self.versions.lock().expect("lock poisoned").push(version.clone());
        Ok(self.files.clone())
    }
}
