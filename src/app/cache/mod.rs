//! Parameter cache: directory resolution, integrity checks and locking
//!
//! # Module Organization
//!
//! - [`config`] - Cache directory and trust settings
//! - [`verification`] - Digest verification and the verified-path cache
//! - [`lock`] - Cross-process advisory lock per artifact
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use param_fetcher::app::cache::{CacheConfig, IntegrityChecker, TrustPolicy, VerifiedSet};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::from_env();
//! let dir = config.ensure_dir().await?;
//!
//! let checker = IntegrityChecker::new(
//!     Arc::new(VerifiedSet::new()),
//!     TrustPolicy::new(config.trust_params),
//! );
//! checker
//!     .verify(&dir.join("v28-fil-inner-product-v1.srs"), "ecd683648512ab1765faa2a5f14bab48")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod lock;
pub mod verification;

// Re-export main public API
pub use config::CacheConfig;
pub use lock::{CacheLock, CacheLockGuard, LockOutcome};
pub use verification::{
    IntegrityChecker, TrustPolicy, VerificationFailure, VerificationReport, VerifiedSet,
};
