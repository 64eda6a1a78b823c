//! Error types for Param Fetcher
//!
//! This module defines the error taxonomy for every component of the fetch
//! engine. Fatal configuration errors abort a fetch before any task starts,
//! while per-artifact failures are collected and reported together.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Manifest decoding errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest bytes are not a valid JSON name → entry mapping
    #[error("Failed to decode {which} manifest")]
    Decode {
        which: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Manifest file could not be read from disk
    #[error("Failed to read manifest file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cache directory errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created
    #[error("Failed to create cache directory: {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache path exists but is not a directory
    #[error("Cache path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// Cross-process lock acquisition errors
#[derive(Error, Debug)]
pub enum LockError {
    /// The lock is held by another process (or another handle in this one)
    #[error("Lock {path} is held by another fetcher")]
    Contended { path: PathBuf },

    /// Any other failure opening or locking the lock file
    #[error("Failed to acquire lock {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cancellation fired while waiting for the lock
    #[error("Cancelled while waiting for lock {path}")]
    Cancelled { path: PathBuf },
}

impl LockError {
    /// Whether this error only signals contention
    pub fn is_contended(&self) -> bool {
        matches!(self, LockError::Contended { .. })
    }
}

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// I/O error on the destination file
    #[error("File I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cancellation fired mid-transfer
    #[error("Download cancelled")]
    Cancelled,
}

/// Content verification errors
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// File does not exist
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Truncated digest does not match
    #[error("Checksum mismatch in param file {path}, {actual} != {expected}")]
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// File exists but could not be read
    #[error("Failed to read {path} for verification")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IntegrityError {
    /// Whether the file was simply absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, IntegrityError::NotFound { .. })
    }
}

/// A failure recorded by one fetch task
#[derive(Error, Debug)]
pub enum FetchError {
    /// Non-contention lock failure (the task keeps retrying)
    #[error("Acquiring filesystem fetch lock for {name}")]
    Lock {
        name: String,
        #[source]
        source: LockError,
    },

    /// Transport or file error during download
    #[error("Fetching file {path} failed")]
    Download {
        path: PathBuf,
        #[source]
        source: DownloadError,
    },

    /// File still failed verification after the final attempt
    #[error("Verifying file {path} failed after {attempts} attempts")]
    Integrity {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: IntegrityError,
    },

    /// Corrupted file could not be removed
    #[error("Remove file {path} failed")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All failures recorded during one fetch call
#[derive(Debug, Default)]
pub struct FetchFailures(pub Vec<FetchError>);

impl FetchFailures {
    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing failed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the recorded failures
    pub fn iter(&self) -> std::slice::Iter<'_, FetchError> {
        self.0.iter()
    }
}

impl fmt::Display for FetchFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error_chain(failure))?;
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Cache directory error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Download client construction error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// One or more artifacts could not be fetched
    #[error("{} artifact fetch failure(s): {}", .0.len(), .0)]
    Incomplete(FetchFailures),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Manifest(_) => "manifest",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Download(_) => "download",
            AppError::Incomplete(_) => "fetch",
            AppError::Generic { .. } => "generic",
        }
    }

    /// Message followed by every underlying cause
    pub fn report(&self) -> String {
        error_chain(self)
    }

    /// Whether the error happened before any artifact was scheduled
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            AppError::Manifest(_) | AppError::Cache(_) | AppError::Config(_)
        )
    }
}

/// Render `error` and its causes joined by `": "`
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Lock result type alias
pub type LockResult<T> = std::result::Result<T, LockError>;

/// Integrity result type alias
pub type IntegrityResult<T> = std::result::Result<T, IntegrityError>;
