//! Cache configuration types and defaults
//!
//! This module resolves the parameter cache directory and the trust policy
//! from explicit settings or the environment.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{env, paths};
use crate::errors::{CacheError, CacheResult};

/// Configuration for the parameter cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory for cached parameter files (default path if None)
    pub cache_root: Option<PathBuf>,
    /// Skip verification of trustable parameter files
    pub trust_params: bool,
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root: Some(cache_root),
            ..Default::default()
        }
    }

    /// Enable or disable the trust bypass
    pub fn with_trust_params(mut self, enabled: bool) -> Self {
        self.trust_params = enabled;
        self
    }

    /// Build a configuration from `FIL_PROOFS_PARAMETER_CACHE` and `TRUST_PARAMS`
    pub fn from_env() -> Self {
        Self::default().apply_env_values(
            std::env::var(env::CACHE_DIR).ok(),
            std::env::var(env::TRUST_PARAMS).ok(),
        )
    }

    /// Overlay environment values onto this configuration.
    ///
    /// An empty cache override is ignored; the trust flag is only enabled by
    /// the exact value `"1"`.
    pub fn apply_env_values(mut self, cache_dir: Option<String>, trust: Option<String>) -> Self {
        if let Some(dir) = cache_dir.filter(|d| !d.is_empty()) {
            self.cache_root = Some(PathBuf::from(dir));
        }
        if let Some(flag) = trust {
            self.trust_params = flag == "1";
        }
        self
    }

    /// The effective cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(paths::DEFAULT_CACHE_DIR))
    }

    /// Create the cache directory if needed and return its path
    pub async fn ensure_dir(&self) -> CacheResult<PathBuf> {
        let dir = self.cache_dir();
        ensure_dir(&dir).await?;
        Ok(dir)
    }
}

async fn ensure_dir(dir: &Path) -> CacheResult<()> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => {
            debug!("Using parameter cache directory {}", dir.display());
            Ok(())
        }
        Err(source) => {
            if let Ok(meta) = tokio::fs::metadata(dir).await {
                if !meta.is_dir() {
                    return Err(CacheError::NotADirectory {
                        path: dir.to_path_buf(),
                    });
                }
            }
            Err(CacheError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })
        }
    }
}
