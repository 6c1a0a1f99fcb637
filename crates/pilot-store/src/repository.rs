use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use pilot_core::{Cancellation, RollbackState};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::lock::{FileLock, LockMode, LockPolicy};
use crate::wrapper::{SCHEMA_VERSION, StateMetadata, StateWrapper, checksum};

const LATEST_FILENAME: &str = "latest.txt";
const STATE_PREFIX: &str = "state-";
const STATE_SUFFIX: &str = ".json";

/// Persists and restores workflow state by session id.
pub trait StateRepository: Send + Sync {
    /// Durably writes `state`, replacing any earlier snapshot of the same
    /// session, and records it as the latest session.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or the file cannot be
    /// written.
    fn save(&self, cancellation: &Cancellation, state: &RollbackState) -> Result<()>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown sessions, and a distinct
    /// error for lock timeouts, schema mismatches and corrupted files.
    fn load(&self, cancellation: &Cancellation, session_id: &str) -> Result<RollbackState>;

    /// Loads the most recently saved session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoLatestState`] if nothing was saved yet, or any
    /// error [`load`](Self::load) can return.
    fn load_latest(&self, cancellation: &Cancellation) -> Result<RollbackState>;

    /// Removes a session's state. Removing an unknown session is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or the file cannot be
    /// removed.
    fn delete(&self, cancellation: &Cancellation, session_id: &str) -> Result<()>;

    /// Checks for a saved session without taking any lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be inspected.
    fn exists(&self, session_id: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub lock_timeout: Duration,
    pub lock_retry_interval: Duration,
}

impl StoreConfig {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".release-state"),
            lock_timeout: Duration::from_secs(30),
            lock_retry_interval: Duration::from_millis(100),
        }
    }
}

/// [`StateRepository`] storing one pretty-printed JSON file per session.
#[derive(Debug)]
pub struct JsonStateRepository {
    config: StoreConfig,
    latest: RwLock<()>,
}

impl JsonStateRepository {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            latest: RwLock::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    #[must_use]
    pub fn state_path(&self, session_id: &str) -> PathBuf {
        self.config
            .dir
            .join(format!("{STATE_PREFIX}{session_id}{STATE_SUFFIX}"))
    }

    fn lock_path(&self, session_id: &str) -> PathBuf {
        self.config.dir.join(format!(".state-{session_id}.lock"))
    }

    fn latest_path(&self) -> PathBuf {
        self.config.dir.join(LATEST_FILENAME)
    }

    fn lock_policy(&self) -> LockPolicy {
        LockPolicy {
            timeout: self.config.lock_timeout,
            retry_interval: self.config.lock_retry_interval,
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&self.config.dir)
            .map_err(|source| StoreError::io(&self.config.dir, source))
    }

    fn update_latest(&self, state_path: &Path) -> Result<()> {
        let _guard = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        let content = state_path.to_string_lossy();
        write_atomically(&self.config.dir, &self.latest_path(), content.as_bytes())
    }

    fn read_latest(&self) -> Result<String> {
        let _guard = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        let path = self.latest_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NoLatestState {
                dir: self.config.dir.clone(),
            }),
            Err(source) => Err(StoreError::io(path, source)),
        }
    }
}

impl Default for JsonStateRepository {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl StateRepository for JsonStateRepository {
    fn save(&self, cancellation: &Cancellation, state: &RollbackState) -> Result<()> {
        let session_id = state.session_id();
        validate_session_id(session_id)?;
        self.ensure_dir()?;

        let _lock = FileLock::acquire(
            &self.lock_path(session_id),
            LockMode::Exclusive,
            self.lock_policy(),
            cancellation,
        )?;

        let wrapper =
            StateWrapper::new(state.clone()).map_err(|source| StoreError::Serialize {
                session_id: session_id.to_string(),
                source,
            })?;
        let data =
            serde_json::to_vec_pretty(&wrapper).map_err(|source| StoreError::Serialize {
                session_id: session_id.to_string(),
                source,
            })?;

        let path = self.state_path(session_id);
        write_atomically(&self.config.dir, &path, &data)?;
        debug!(
            session_id,
            status = %state.status(),
            path = %path.display(),
            "saved workflow state"
        );

        self.update_latest(&path)
    }

    fn load(&self, cancellation: &Cancellation, session_id: &str) -> Result<RollbackState> {
        validate_session_id(session_id)?;
        let path = self.state_path(session_id);
        if !path
            .try_exists()
            .map_err(|source| StoreError::io(&path, source))?
        {
            return Err(StoreError::NotFound {
                session_id: session_id.to_string(),
            });
        }

        let _lock = FileLock::acquire(
            &self.lock_path(session_id),
            LockMode::Shared,
            self.lock_policy(),
            cancellation,
        )?;

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    session_id: session_id.to_string(),
                });
            }
            Err(source) => return Err(StoreError::io(&path, source)),
        };

        let state = decode(&path, &data)?;
        debug!(session_id, status = %state.status(), "loaded workflow state");
        Ok(state)
    }

    fn load_latest(&self, cancellation: &Cancellation) -> Result<RollbackState> {
        let target = self.read_latest()?;
        let target = target.trim();
        let session_id = session_id_from_path(target).ok_or_else(|| {
            StoreError::InvalidLatestPointer {
                path: self.latest_path(),
                target: target.to_string(),
            }
        })?;
        self.load(cancellation, session_id)
    }

    fn delete(&self, cancellation: &Cancellation, session_id: &str) -> Result<()> {
        validate_session_id(session_id)?;
        let lock_path = self.lock_path(session_id);
        if !self
            .config
            .dir
            .try_exists()
            .map_err(|source| StoreError::io(&self.config.dir, source))?
        {
            return Ok(());
        }

        let lock = FileLock::acquire(
            &lock_path,
            LockMode::Exclusive,
            self.lock_policy(),
            cancellation,
        )?;

        let path = self.state_path(session_id);
        match fs::remove_file(&path) {
            Ok(()) => debug!(session_id, "deleted workflow state"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::io(path, source)),
        }

        drop(lock);
        if let Err(error) = fs::remove_file(&lock_path)
            && error.kind() != ErrorKind::NotFound
        {
            warn!(path = %lock_path.display(), %error, "failed to remove state lock file");
        }
        Ok(())
    }

    fn exists(&self, session_id: &str) -> Result<bool> {
        validate_session_id(session_id)?;
        let path = self.state_path(session_id);
        path.try_exists()
            .map_err(|source| StoreError::io(path, source))
    }
}

fn decode(path: &Path, data: &[u8]) -> Result<RollbackState> {
    #[derive(serde::Deserialize)]
    struct RawWrapper {
        metadata: StateMetadata,
        state: serde_json::Value,
    }

    let raw: RawWrapper = serde_json::from_slice(data).map_err(|source| StoreError::Corrupted {
        path: path.to_path_buf(),
        source,
    })?;

    if raw.metadata.schema_version != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            path: path.to_path_buf(),
            found: raw.metadata.schema_version,
            expected: SCHEMA_VERSION,
        });
    }

    let state: RollbackState =
        serde_json::from_value(raw.state).map_err(|source| StoreError::Corrupted {
            path: path.to_path_buf(),
            source,
        })?;

    let actual = checksum(&state).map_err(|source| StoreError::Corrupted {
        path: path.to_path_buf(),
        source,
    })?;
    if actual != raw.metadata.checksum {
        return Err(StoreError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: raw.metadata.checksum,
            actual,
        });
    }

    Ok(state)
}

/// Writes `data` to a temporary file in `dir` and renames it over `path`.
///
/// The temporary file is removed if the rename fails.
fn write_atomically(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(dir)
        .map_err(|source| StoreError::io(dir, source))?;
    set_private(&temp)?;
    temp.write_all(data)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|source| StoreError::io(temp.path(), source))?;
    temp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_private(temp: &NamedTempFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))
        .map_err(|source| StoreError::io(temp.path(), source))
}

#[cfg(not(unix))]
fn set_private(_temp: &NamedTempFile) -> Result<()> {
    Ok(())
}

fn session_id_from_path(target: &str) -> Option<&str> {
    let file_name = Path::new(target).file_name()?.to_str()?;
    let id = file_name
        .strip_prefix(STATE_PREFIX)?
        .strip_suffix(STATE_SUFFIX)?;
    (!id.is_empty()).then_some(id)
}

fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}
