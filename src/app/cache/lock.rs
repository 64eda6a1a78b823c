//! Cross-process advisory locks for parameter downloads
//!
//! Each artifact gets its own lock file `<name>.fetch.lock` inside the cache
//! directory, so unrelated artifacts can be fetched concurrently by separate
//! processes while writers of the same file are serialized.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::constants::lock;
use crate::errors::{LockError, LockResult};

/// Held lock; released when dropped
#[derive(Debug)]
pub struct CacheLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for CacheLockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            error!("unlock fs lock {}: {}", self.path.display(), e);
        }
    }
}

/// Result of a blocking acquisition
#[derive(Debug)]
pub struct LockOutcome {
    /// The held lock
    pub guard: CacheLockGuard,
    /// Whether any attempt contended or failed before success
    pub waited: bool,
}

/// Named lock scoped to a directory
#[derive(Debug, Clone)]
pub struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    /// Lock for artifact `name` inside `dir`
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            path: lock_path(dir, name),
        }
    }

    /// Single non-blocking acquisition attempt
    ///
    /// # Errors
    ///
    /// Returns `LockError::Contended` if another handle holds the lock and
    /// `LockError::Io` for any other failure.
    pub fn try_acquire(&self) -> LockResult<CacheLockGuard> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| LockError::Io {
                path: self.path.clone(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(CacheLockGuard {
                file,
                path: self.path.clone(),
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::Contended {
                    path: self.path.clone(),
                })
            }
            Err(source) => Err(LockError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Acquire the lock, retrying every `retry_interval` until it succeeds.
    ///
    /// Contention and other errors are both retried indefinitely. Every
    /// non-contention error is passed to `on_error` before the next wait.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Cancelled` if `cancel` fires while waiting.
    pub async fn acquire(
        &self,
        retry_interval: Duration,
        cancel: &CancellationToken,
        mut on_error: impl FnMut(LockError),
    ) -> LockResult<LockOutcome> {
        let mut waited = false;

        loop {
            if cancel.is_cancelled() {
                return Err(LockError::Cancelled {
                    path: self.path.clone(),
                });
            }

            match self.try_acquire() {
                Ok(guard) => return Ok(LockOutcome { guard, waited }),
                Err(e) if e.is_contended() => {
                    warn!(
                        "acquiring filesystem fetch lock: {}; will retry in {:?}",
                        e, retry_interval
                    );
                }
                Err(e) => {
                    info!("lock error: {}", e);
                    on_error(e);
                }
            }
            waited = true;

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(retry_interval) => {}
            }
        }
    }
}

/// Lock file path for artifact `name`
pub fn lock_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, lock::LOCK_FILE_SUFFIX))
}
