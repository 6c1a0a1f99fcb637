use std::path::{Path, PathBuf};
use std::time::Duration;

use pilot_git::Signature;
use pilot_saga::{RetryPolicy, SagaConfig};
use pilot_store::StoreConfig;
use serde::Deserialize;

use crate::{OperationError, Result};

pub const CONFIG_FILENAME: &str = "release-pilot.toml";

/// Settings loaded from `release-pilot.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PilotConfig {
    #[serde(default)]
    pub saga: SagaSettings,
    #[serde(default)]
    pub state: StateSettings,
    #[serde(default)]
    pub release: ReleaseSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SagaSettings {
    pub enable_rollback: bool,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub rollback_timeout_secs: u64,
    /// Upper bound for a whole forward run.
    pub workflow_timeout_secs: u64,
}

impl Default for SagaSettings {
    fn default() -> Self {
        Self {
            enable_rollback: false,
            max_attempts: 4,
            initial_delay_ms: 1000,
            rollback_timeout_secs: 600,
            workflow_timeout_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateSettings {
    /// Relative paths resolve against the project root.
    pub dir: PathBuf,
    pub lock_timeout_secs: u64,
    pub lock_retry_interval_ms: u64,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".release-state"),
            lock_timeout_secs: 30,
            lock_retry_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSettings {
    pub base_branch: String,
    pub branch_prefix: String,
    /// Version bumped from when the repository has no tags.
    pub initial_version: String,
    pub labels: Vec<String>,
    pub commit_user_name: String,
    pub commit_user_email: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            base_branch: "main".to_string(),
            branch_prefix: "release/".to_string(),
            initial_version: "v0.0.0".to_string(),
            labels: vec!["release-pending".to_string(), "automated".to_string()],
            commit_user_name: "github-actions[bot]".to_string(),
            commit_user_email: "github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

impl ReleaseSettings {
    #[must_use]
    pub fn commit_signature(&self) -> Signature {
        Signature {
            name: self.commit_user_name.clone(),
            email: self.commit_user_email.clone(),
        }
    }

    #[must_use]
    pub fn branch_name(&self, version: &str) -> String {
        format!("{}{version}", self.branch_prefix)
    }
}

impl PilotConfig {
    /// Reads `release-pilot.toml` from `project_root`, falling back to the
    /// defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(OperationError::ConfigRead { path, source }),
        };
        toml::from_str(&content).map_err(|source| OperationError::ConfigParse {
            path,
            source: Box::new(source),
        })
    }

    #[must_use]
    pub fn saga_config(&self) -> SagaConfig {
        SagaConfig {
            enable_rollback: self.saga.enable_rollback,
            retry: RetryPolicy::new(
                self.saga.max_attempts,
                Duration::from_millis(self.saga.initial_delay_ms),
            ),
            rollback_timeout: Duration::from_secs(self.saga.rollback_timeout_secs),
        }
    }

    #[must_use]
    pub fn workflow_timeout(&self) -> Duration {
        Duration::from_secs(self.saga.workflow_timeout_secs)
    }

    #[must_use]
    pub fn store_config(&self, project_root: &Path) -> StoreConfig {
        StoreConfig {
            dir: project_root.join(&self.state.dir),
            lock_timeout: Duration::from_secs(self.state.lock_timeout_secs),
            lock_retry_interval: Duration::from_millis(self.state.lock_retry_interval_ms),
        }
    }
}
