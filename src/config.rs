//! Configuration management for Param Fetcher
//!
//! Settings are merged from several sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML config file (`--config`, `./param-fetcher.toml`, or the user
//!    config directory)
//! 3. Environment variables (`FIL_PROOFS_PARAMETER_CACHE`, `IPFS_GATEWAY`,
//!    `TRUST_PARAMS`)
//! 4. Command line flags

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig, CoordinatorConfig};
use crate::constants::{env, fetch, http, lock, paths};
use crate::errors::{ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache directory and trust settings
    pub cache: CacheConfigToml,
    /// Gateway and HTTP client settings
    pub client: ClientConfigToml,
    /// Fetch retry policy
    pub coordinator: CoordinatorConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory path (default location if unset)
    pub cache_root: Option<PathBuf>,
    /// Skip verification of trustable `.params` files
    pub trust_params: bool,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Gateway base URL (default gateway if unset)
    pub gateway: Option<String>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// TCP keep-alive in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            gateway: None,
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            tcp_keepalive_secs: Some(http::TCP_KEEPALIVE.as_secs()),
            tcp_nodelay: true,
            pool_idle_timeout_secs: None,
        }
    }
}

/// TOML-friendly coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfigToml {
    /// Seconds between cross-process lock attempts
    pub lock_retry_secs: u64,
    /// Download cycles per artifact
    pub max_attempts: u32,
}

impl Default for CoordinatorConfigToml {
    fn default() -> Self {
        Self {
            lock_retry_secs: lock::RETRY_INTERVAL.as_secs(),
            max_attempts: fetch::MAX_ATTEMPTS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub cache: CacheConfig,
    pub client: ClientConfig,
    pub coordinator: CoordinatorConfig,
}

impl RuntimeConfig {
    /// Apply command line overrides
    pub fn with_overrides(mut self, cache_dir: Option<PathBuf>, gateway: Option<String>) -> Self {
        if let Some(dir) = cache_dir {
            self.cache.cache_root = Some(dir);
        }
        if let Some(gateway) = gateway {
            self.client.gateway = gateway;
        }
        self
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            cache: self.cache.to_runtime_config(),
            client: self.client.to_runtime_config(),
            coordinator: self.coordinator.to_runtime_config(),
        }
    }

    /// Runtime configuration with environment overrides applied
    pub fn to_runtime_config_with_env(&self) -> RuntimeConfig {
        self.apply_env_values(
            std::env::var(env::CACHE_DIR).ok(),
            std::env::var(env::GATEWAY).ok(),
            std::env::var(env::TRUST_PARAMS).ok(),
        )
    }

    /// Runtime configuration with the given environment values applied
    pub fn apply_env_values(
        &self,
        cache_dir: Option<String>,
        gateway: Option<String>,
        trust: Option<String>,
    ) -> RuntimeConfig {
        let runtime = self.to_runtime_config();
        RuntimeConfig {
            cache: runtime.cache.apply_env_values(cache_dir, trust),
            client: runtime.client.apply_env_values(gateway),
            coordinator: runtime.coordinator,
        }
    }

    /// Check values that would only fail later at fetch time
    pub fn validate(&self) -> Result<()> {
        self.coordinator
            .to_runtime_config()
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "coordinator".to_string(),
                value: format!("{:?}", self.coordinator),
                reason,
            })?;

        if self.client.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.connect_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Connect timeout cannot be zero".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Load configuration from the first file found
    ///
    /// An explicitly given file must exist; the default locations are
    /// optional and defaults are used when none exists.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };
        config.validate()?;

        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(paths::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        debug!("No config file found in standard locations");
        None
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

impl CacheConfigToml {
    /// Convert to runtime CacheConfig
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig {
            cache_root: self.cache_root.clone(),
            trust_params: self.trust_params,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            gateway: self.gateway.clone().unwrap_or(defaults.gateway),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl CoordinatorConfigToml {
    /// Convert to runtime CoordinatorConfig
    pub fn to_runtime_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            lock_retry_interval: Duration::from_secs(self.lock_retry_secs),
            max_attempts: self.max_attempts,
        }
    }
}
