//! Per-artifact fetch task
//!
//! A task checks the cached copy, takes the artifact's cross-process lock,
//! re-checks if it had to wait, then downloads and verifies, removing and
//! re-fetching a corrupted file once before giving up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::cache::{CacheLock, IntegrityChecker};
use crate::app::client::{GatewayClient, ProgressReporter};
use crate::app::manifest::ManifestEntry;
use crate::errors::{DownloadError, FetchError};

use super::config::CoordinatorConfig;

/// Append-only failure log shared by every task of one fetch call
pub(crate) type FailureLog = Arc<Mutex<Vec<FetchError>>>;

/// State shared by every task of one fetch call
pub(crate) struct TaskContext {
    pub dir: PathBuf,
    pub checker: IntegrityChecker,
    pub client: GatewayClient,
    pub progress: Arc<dyn ProgressReporter>,
    pub config: CoordinatorConfig,
    pub failures: FailureLog,
    pub cancel: CancellationToken,
}

impl TaskContext {
    fn record(&self, failure: FetchError) {
        self.failures.lock().push(failure);
    }
}

/// How a cached copy looked when checked
enum Check {
    Valid,
    Missing,
    Invalid,
}

pub(crate) struct FetchTask {
    name: String,
    entry: ManifestEntry,
    ctx: Arc<TaskContext>,
}

impl FetchTask {
    pub fn new(name: String, entry: ManifestEntry, ctx: Arc<TaskContext>) -> Self {
        Self { name, entry, ctx }
    }

    pub async fn run(self) {
        let path = self.ctx.dir.join(&self.name);

        if let Check::Valid = self.check(&path).await {
            return;
        }

        let lock = CacheLock::new(&self.ctx.dir, &self.name);
        let outcome = lock
            .acquire(self.ctx.config.lock_retry_interval, &self.ctx.cancel, |source| {
                self.ctx.record(FetchError::Lock {
                    name: self.name.clone(),
                    source,
                })
            })
            .await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Stopped fetching {}: {}", self.name, e);
                return;
            }
        };

        // Another fetcher may have completed the file while we waited
        if outcome.waited {
            if let Check::Valid = self.check(&path).await {
                return;
            }
        }

        self.download_verified(&path).await;
        drop(outcome.guard);
    }

    async fn check(&self, path: &Path) -> Check {
        match self.ctx.checker.verify(path, &self.entry.digest).await {
            Ok(()) => Check::Valid,
            Err(e) if e.is_not_found() => Check::Missing,
            Err(e) => {
                warn!("{}", e);
                Check::Invalid
            }
        }
    }

    async fn download_verified(&self, path: &Path) {
        let max_attempts = self.ctx.config.max_attempts;

        for attempt in 1..=max_attempts {
            let fetched = self
                .ctx
                .client
                .download_artifact(
                    &self.entry.content_id,
                    path,
                    &self.name,
                    self.ctx.progress.as_ref(),
                    &self.ctx.cancel,
                )
                .await;
            match fetched {
                Ok(_) => {}
                Err(DownloadError::Cancelled) => {
                    debug!("Download of {} cancelled", self.name);
                    return;
                }
                Err(source) => {
                    self.ctx.record(FetchError::Download {
                        path: path.to_path_buf(),
                        source,
                    });
                    return;
                }
            }

            let source = match self.ctx.checker.verify(path, &self.entry.digest).await {
                Ok(()) => return,
                Err(e) => e,
            };

            if attempt < max_attempts {
                error!(
                    "sanity checking fetched file failed, removing and retrying: {}",
                    source
                );
            }
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    self.ctx.record(FetchError::Remove {
                        path: path.to_path_buf(),
                        source: e,
                    });
                    return;
                }
            }
            if attempt == max_attempts {
                self.ctx.record(FetchError::Integrity {
                    path: path.to_path_buf(),
                    attempts: max_attempts,
                    source,
                });
                return;
            }
            info!("Re-fetching {} from scratch", self.name);
        }
    }
}
