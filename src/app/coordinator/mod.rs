//! Fetch orchestration
//!
//! This module provides the coordination layer that turns two manifests into
//! a set of per-artifact fetch tasks, de-duplicates them within the process,
//! waits for them (or for cancellation) and aggregates their failures.
//!
//! # Architecture
//!
//! - [`config`] - Retry policy and validation
//! - [`session`] - In-process de-duplication and verified-path state
//! - [`task`] - The per-artifact check → lock → download → verify loop
//! - [`signals`] - Signal handling that cancels a running fetch
//!
//! # Examples
//!
//! ```rust,no_run
//! use param_fetcher::app::{CacheConfig, ClientConfig, Coordinator, CoordinatorConfig, FetchSession};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new(
//!     CoordinatorConfig::default(),
//!     CacheConfig::from_env(),
//!     ClientConfig::from_env(),
//!     FetchSession::shared(),
//! )?;
//!
//! let params = std::fs::read("parameters.json")?;
//! coordinator
//!     .fetch_all(&params, b"{}", 2048, &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod session;
pub mod signals;
mod task;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::app::cache::{CacheConfig, IntegrityChecker, TrustPolicy, VerificationReport};
use crate::app::client::{ClientConfig, GatewayClient, NoProgress, ProgressReporter};
use crate::app::manifest::{Manifest, ManifestEntry};
use crate::errors::{AppError, ConfigError, FetchFailures, Result};

pub use config::CoordinatorConfig;
pub use session::FetchSession;
pub use signals::SignalHandler;

use task::{FailureLog, FetchTask, TaskContext};

/// Counts logged at the end of scheduling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Tasks spawned by this call
    pub scheduled: usize,
    /// `.params` entries for another storage size
    pub skipped_by_size: usize,
    /// Entries already claimed by an earlier or concurrent call
    pub already_started: usize,
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scheduled, {} skipped for other sizes, {} already started",
            self.scheduled, self.skipped_by_size, self.already_started
        )
    }
}

/// Selected manifest entries for one call
#[derive(Debug)]
struct Selection {
    entries: Vec<(String, ManifestEntry)>,
    skipped_by_size: usize,
}

/// Main coordinator for fetching parameter files
pub struct Coordinator {
    config: CoordinatorConfig,
    cache: CacheConfig,
    client: GatewayClient,
    session: Arc<FetchSession>,
    progress: Arc<dyn ProgressReporter>,
}

impl Coordinator {
    /// Create a coordinator without progress display
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `config` is invalid and
    /// `AppError::Download` if the gateway client cannot be built.
    pub fn new(
        config: CoordinatorConfig,
        cache: CacheConfig,
        client: ClientConfig,
        session: Arc<FetchSession>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "coordinator".to_string(),
                value: format!("{:?}", config),
                reason,
            })?;
        let client = GatewayClient::new(client)?;

        Ok(Self {
            config,
            cache,
            client,
            session,
            progress: Arc::new(NoProgress),
        })
    }

    /// Coordinator configured from the environment, using the shared session
    pub fn from_env() -> Result<Self> {
        Self::new(
            CoordinatorConfig::default(),
            CacheConfig::from_env(),
            ClientConfig::from_env(),
            FetchSession::shared(),
        )
    }

    /// Report download progress through `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch and verify every artifact selected from the two manifests.
    ///
    /// `primary` entries named `*.params` are fetched only when their storage
    /// size equals `storage_size`; everything else in `primary` and all of
    /// `secondary` is always fetched. Artifacts already claimed in this
    /// session are skipped.
    ///
    /// On cancellation the call returns without waiting for in-flight tasks,
    /// reporting only the failures recorded so far.
    ///
    /// # Errors
    ///
    /// - `AppError::Cache` if the cache directory cannot be created
    /// - `AppError::Manifest` if either manifest fails to decode
    /// - `AppError::Incomplete` with every failure recorded by the tasks
    pub async fn fetch_all(
        &self,
        primary: &[u8],
        secondary: &[u8],
        storage_size: u64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let started = Instant::now();
        let dir = self.cache.ensure_dir().await?;
        let selection = Self::select(primary, secondary, storage_size)?;

        let failures: FailureLog = Arc::default();
        let ctx = Arc::new(TaskContext {
            dir,
            checker: IntegrityChecker::new(
                self.session.verified(),
                TrustPolicy::new(self.cache.trust_params),
            ),
            client: self.client.clone(),
            progress: Arc::clone(&self.progress),
            config: self.config.clone(),
            failures: Arc::clone(&failures),
            cancel: cancel.clone(),
        });

        let mut summary = FetchSummary {
            skipped_by_size: selection.skipped_by_size,
            ..Default::default()
        };
        let tracker = TaskTracker::new();
        for (name, entry) in selection.entries {
            if !self.session.try_start(&name) {
                debug!("{} already fetched or being fetched", name);
                summary.already_started += 1;
                continue;
            }
            summary.scheduled += 1;
            tracker.spawn(FetchTask::new(name, entry, Arc::clone(&ctx)).run());
        }
        tracker.close();
        info!("Parameter fetch: {}", summary);

        tokio::select! {
            _ = tracker.wait() => {
                info!("parameter and key-fetching complete in {:?}", started.elapsed());
            }
            _ = cancel.cancelled() => {
                warn!("context closed... shutting down ({} task(s) still running)", tracker.len());
            }
        }

        let recorded = std::mem::take(&mut *failures.lock());
        if recorded.is_empty() {
            Ok(())
        } else {
            Err(AppError::Incomplete(FetchFailures(recorded)))
        }
    }

    /// Check the selected artifacts in the cache without downloading anything
    ///
    /// # Errors
    ///
    /// Returns `AppError::Manifest` if either manifest fails to decode.
    pub async fn verify_all(
        &self,
        primary: &[u8],
        secondary: &[u8],
        storage_size: u64,
    ) -> Result<VerificationReport> {
        let started = Instant::now();
        let dir = self.cache.cache_dir();
        let selection = Self::select(primary, secondary, storage_size)?;
        let checker = IntegrityChecker::new(
            self.session.verified(),
            TrustPolicy::new(self.cache.trust_params),
        );

        let mut report = VerificationReport::new();
        for (name, entry) in &selection.entries {
            let outcome = checker.verify(&dir.join(name), &entry.digest).await;
            report.record(name, outcome);
        }
        report.set_verification_time(started.elapsed());

        Ok(report)
    }

    fn select(primary: &[u8], secondary: &[u8], storage_size: u64) -> Result<Selection> {
        let params = Manifest::from_slice(primary, "parameter")?;
        let srs = Manifest::from_slice(secondary, "SRS")?;

        let mut entries: Vec<(String, ManifestEntry)> = params
            .select_for_size(storage_size)
            .map(|(name, entry)| (name.to_string(), entry.clone()))
            .collect();
        let skipped_by_size = params.len() - entries.len();
        entries.extend(
            srs.iter()
                .map(|(name, entry)| (name.to_string(), entry.clone())),
        );

        Ok(Selection {
            entries,
            skipped_by_size,
        })
    }
}

/// Fetch with the environment-derived configuration and the shared session
///
/// # Errors
///
/// See [`Coordinator::fetch_all`].
pub async fn get_params(
    primary: &[u8],
    secondary: &[u8],
    storage_size: u64,
    cancel: &CancellationToken,
) -> Result<()> {
    Coordinator::from_env()?
        .fetch_all(primary, secondary, storage_size, cancel)
        .await
}
