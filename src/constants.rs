//! Application constants for Param Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Overrides the parameter cache directory
    pub const CACHE_DIR: &str = "FIL_PROOFS_PARAMETER_CACHE";

    /// Overrides the gateway base URL
    pub const GATEWAY: &str = "IPFS_GATEWAY";

    /// When set to "1", trustable parameter files skip verification
    pub const TRUST_PARAMS: &str = "TRUST_PARAMS";
}

/// Default locations
pub mod paths {
    /// Default parameter cache directory
    pub const DEFAULT_CACHE_DIR: &str = "/var/tmp/filecoin-proof-parameters";

    /// Default gateway base URL (content ids are appended to it)
    pub const DEFAULT_GATEWAY: &str = "https://proofs.filecoin.io/ipfs/";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "param-fetcher.toml";

    /// Directory name under the user config directory
    pub const CONFIG_DIR_NAME: &str = "param-fetcher";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("param-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// TCP keep-alive interval
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Cross-process lock constants
pub mod lock {
    use super::Duration;

    /// Suffix appended to an artifact name to form its lock file name
    pub const LOCK_FILE_SUFFIX: &str = "fetch.lock";

    /// Delay between lock acquisition attempts
    pub const RETRY_INTERVAL: Duration = Duration::from_secs(10);
}

/// Fetch policy constants
pub mod fetch {
    /// Download → verify cycles per artifact before giving up
    pub const MAX_ATTEMPTS: u32 = 2;

    /// Name suffix of size-specific parameter files
    pub const PARAMS_SUFFIX: &str = ".params";
}

/// Integrity verification constants
pub mod verify {
    /// Digest length in bytes (prefix of the BLAKE2b-512 output)
    pub const DIGEST_LEN: usize = 16;

    /// Read buffer size for hashing
    pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

    /// Suffix of files eligible for the trust bypass
    pub const TRUSTABLE_SUFFIX: &str = "params";

    /// Files with this prefix are always verified
    pub const UNTRUSTED_PREFIX: &str = "v28-empty-sector-update";
}

// Re-export commonly used constants for convenience
pub use env::{CACHE_DIR as ENV_CACHE_DIR, GATEWAY as ENV_GATEWAY, TRUST_PARAMS as ENV_TRUST_PARAMS};
pub use http::USER_AGENT;
pub use paths::{DEFAULT_CACHE_DIR, DEFAULT_GATEWAY};
