//! Hash verification and cache integrity checking
//!
//! This module verifies cached parameter files against their manifest digests,
//! remembers which paths have already been verified, and implements the
//! `TRUST_PARAMS` bypass for non-production setups.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::app::digest::ContentDigest;
use crate::constants::verify;
use crate::errors::{IntegrityError, IntegrityResult};

/// Paths whose content has been confirmed to match their digest.
///
/// Positive cache only: entries are never removed, so a file corrupted after
/// verification keeps passing for the lifetime of the set.
#[derive(Debug, Default)]
pub struct VerifiedSet {
    paths: Mutex<HashSet<PathBuf>>,
}

impl VerifiedSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` has been verified
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.lock().contains(path)
    }

    /// Record `path` as verified
    pub fn insert(&self, path: PathBuf) {
        self.paths.lock().insert(path);
    }

    /// Number of verified paths
    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    /// Whether no path has been verified yet
    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }
}

/// Decides which files may skip verification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustPolicy {
    trust_params: bool,
}

impl TrustPolicy {
    /// Create a policy; `trust_params` mirrors `TRUST_PARAMS=1`
    pub fn new(trust_params: bool) -> Self {
        Self { trust_params }
    }

    /// Whether verification of `path` is skipped
    pub fn bypasses(&self, path: &Path) -> bool {
        if !self.trust_params {
            return false;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.ends_with(verify::TRUSTABLE_SUFFIX) && !name.starts_with(verify::UNTRUSTED_PREFIX)
    }
}

/// Verifies files against expected digests
#[derive(Debug, Clone)]
pub struct IntegrityChecker {
    verified: Arc<VerifiedSet>,
    trust: TrustPolicy,
}

impl IntegrityChecker {
    /// Create a checker sharing `verified` with other checkers of the same session
    pub fn new(verified: Arc<VerifiedSet>, trust: TrustPolicy) -> Self {
        Self { verified, trust }
    }

    /// Verify `path` against `expected_digest`
    ///
    /// # Errors
    ///
    /// - `IntegrityError::NotFound` if the file does not exist
    /// - `IntegrityError::Mismatch` if the digest differs (the file is kept)
    /// - `IntegrityError::Io` for any other read failure
    pub async fn verify(&self, path: &Path, expected_digest: &str) -> IntegrityResult<()> {
        if self.trust.bypasses(path) {
            debug!("Skipping param check: {}", path.display());
            warn!("Assuming parameter files are ok. DO NOT USE IN PRODUCTION");
            return Ok(());
        }

        if self.verified.contains(path) {
            return Ok(());
        }

        let actual = Self::compute_digest(path).await?;
        if actual.matches(expected_digest) {
            info!("Parameter file {} is ok", path.display());
            self.verified.insert(path.to_path_buf());
            Ok(())
        } else {
            Err(IntegrityError::Mismatch {
                path: path.to_path_buf(),
                expected: expected_digest.to_string(),
                actual: actual.to_hex(),
            })
        }
    }

    /// Hash a file on the blocking pool
    pub async fn compute_digest(path: &Path) -> IntegrityResult<ContentDigest> {
        let owned = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || ContentDigest::of_file(&owned))
            .await
            .map_err(|e| IntegrityError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;

        result.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IntegrityError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IntegrityError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }
}

/// Cache verification report
#[derive(Debug, Default)]
pub struct VerificationReport {
    /// Total files checked
    pub files_checked: usize,
    /// Files that passed verification
    pub files_verified: usize,
    /// Files that failed verification (including missing ones)
    pub files_failed: usize,
    /// Files that were missing
    pub files_missing: usize,
    /// Total verification time
    pub verification_time: Duration,
    /// Failed files with details
    pub failed_files: Vec<VerificationFailure>,
}

/// Details about a verification failure
#[derive(Debug)]
pub struct VerificationFailure {
    /// Artifact name
    pub name: String,
    /// Underlying error
    pub error: IntegrityError,
}

impl VerificationReport {
    /// Create a new empty verification report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one check
    pub fn record(&mut self, name: &str, outcome: IntegrityResult<()>) {
        self.files_checked += 1;
        match outcome {
            Ok(()) => self.files_verified += 1,
            Err(error) => {
                if error.is_not_found() {
                    self.files_missing += 1;
                }
                self.files_failed += 1;
                self.failed_files.push(VerificationFailure {
                    name: name.to_string(),
                    error,
                });
            }
        }
    }

    /// Get verification success rate as percentage
    pub fn success_rate(&self) -> f64 {
        if self.files_checked == 0 {
            0.0
        } else {
            (self.files_verified as f64 / self.files_checked as f64) * 100.0
        }
    }

    /// Check if verification passed (no failures)
    pub fn is_successful(&self) -> bool {
        self.files_failed == 0
    }

    /// Set the total verification time
    pub fn set_verification_time(&mut self, duration: Duration) {
        self.verification_time = duration;
    }
}
