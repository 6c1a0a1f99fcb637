/// Working tree state of a single path relative to HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Clean,
    Modified,
    Added,
    Deleted,
    Renamed,
    Untracked,
    Conflicted,
}

impl FileStatus {
    #[must_use]
    pub fn is_clean(self) -> bool {
        self == Self::Clean
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub name: String,
    pub target_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
}

/// Author and committer identity used for commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

/// Credentials for talking to a remote.
///
/// With a token, HTTPS remotes authenticate as `username:token`. Without
/// one, the SSH agent and the configured credential helpers are tried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteAuth {
    pub username: Option<String>,
    pub token: Option<String>,
}

impl RemoteAuth {
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            username: None,
            token: Some(token.into()),
        }
    }
}
