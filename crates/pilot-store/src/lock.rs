use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pilot_core::Cancellation;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockMode {
    Shared,
    Exclusive,
}

/// Timing of the polling loop used to acquire a lock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LockPolicy {
    pub timeout: Duration,
    pub retry_interval: Duration,
}

/// An advisory lock held on a lock file until dropped.
#[derive(Debug)]
pub(crate) struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Polls for the lock until it is granted, `policy.timeout` elapses, or
    /// `cancellation` fires.
    pub(crate) fn acquire(
        path: &Path,
        mode: LockMode,
        policy: LockPolicy,
        cancellation: &Cancellation,
    ) -> Result<Self> {
        let file = open_lock_file(path)?;
        let started = Instant::now();

        loop {
            cancellation
                .check()
                .map_err(|source| StoreError::Interrupted {
                    path: path.to_path_buf(),
                    source,
                })?;

            let attempt = match mode {
                LockMode::Shared => file.try_lock_shared(),
                LockMode::Exclusive => file.try_lock(),
            };

            match attempt {
                Ok(()) => {
                    debug!(path = %path.display(), ?mode, "acquired state lock");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(TryLockError::WouldBlock) => {}
                Err(TryLockError::Error(source)) => return Err(StoreError::io(path, source)),
            }

            if started.elapsed() >= policy.timeout {
                return Err(StoreError::LockTimeout {
                    path: path.to_path_buf(),
                    timeout: policy.timeout,
                });
            }

            cancellation
                .sleep(policy.retry_interval)
                .map_err(|source| StoreError::Interrupted {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(error) = self.file.unlock() {
            warn!(path = %self.path.display(), %error, "failed to release state lock");
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map_err(|source| StoreError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(timeout_ms: u64) -> LockPolicy {
        LockPolicy {
            timeout: Duration::from_millis(timeout_ms),
            retry_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn shared_locks_coexist() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(".state-a.lock");
        let scope = Cancellation::new();

        let _first = FileLock::acquire(&path, LockMode::Shared, policy(100), &scope)?;
        let second = FileLock::acquire(&path, LockMode::Shared, policy(100), &scope);

        assert!(second.is_ok());
        Ok(())
    }

    #[test]
    fn exclusive_lock_times_out_while_held() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(".state-a.lock");
        let scope = Cancellation::new();

        let _held = FileLock::acquire(&path, LockMode::Exclusive, policy(100), &scope)?;
        let result = FileLock::acquire(&path, LockMode::Exclusive, policy(50), &scope);

        assert!(matches!(result, Err(StoreError::LockTimeout { .. })));
        Ok(())
    }

    #[test]
    fn lock_is_released_on_drop() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(".state-a.lock");
        let scope = Cancellation::new();

        drop(FileLock::acquire(&path, LockMode::Exclusive, policy(100), &scope)?);
        let again = FileLock::acquire(&path, LockMode::Exclusive, policy(50), &scope);

        assert!(again.is_ok());
        Ok(())
    }

    #[test]
    fn cancelled_scope_stops_waiting() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(".state-a.lock");
        let scope = Cancellation::new();
        scope.cancel();

        let result = FileLock::acquire(&path, LockMode::Shared, policy(1000), &scope);

        assert!(matches!(
            result,
            Err(StoreError::Interrupted {
                source: pilot_core::Interrupted::Cancelled,
                ..
            })
        ));
        Ok(())
    }
}
