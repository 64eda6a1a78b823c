//! Core application logic for Param Fetcher
//!
//! This module contains the fetch engine: manifest decoding, content digests,
//! the parameter cache (integrity checks and cross-process locks), the
//! gateway client and the coordinator that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use param_fetcher::app::get_params;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = std::fs::read("parameters.json")?;
//! let srs = std::fs::read("srs-inner-product.json")?;
//!
//! // Uses FIL_PROOFS_PARAMETER_CACHE, IPFS_GATEWAY and TRUST_PARAMS
//! get_params(&params, &srs, 2048, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod coordinator;
pub mod digest;
pub mod manifest;

// Re-export main public API
pub use cache::{CacheConfig, IntegrityChecker, TrustPolicy, VerificationReport, VerifiedSet};
pub use client::{ClientConfig, GatewayClient, NoProgress, ProgressReporter, TransferProgress};
pub use coordinator::{
    get_params, Coordinator, CoordinatorConfig, FetchSession, FetchSummary, SignalHandler,
};
pub use digest::ContentDigest;
pub use manifest::{Manifest, ManifestEntry};
