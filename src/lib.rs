//! Param Fetcher Library
//!
//! A Rust library for fetching content-addressed proof parameter files into a
//! shared local cache. Downloads are resumable, verified against truncated
//! BLAKE2b-512 digests and de-duplicated both within a process and across
//! processes sharing the cache directory.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use app::{get_params, Coordinator, FetchSession};
pub use errors::{AppError, Result};
