//! Command-line argument parsing for Param Fetcher
//!
//! This module defines the CLI structure using clap derive macros: a `fetch`
//! command that downloads and verifies parameter files, and a `verify` command
//! that only inspects the cache.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Param Fetcher - Download and verify proof parameter files
#[derive(Parser, Debug)]
#[command(
    name = "param_fetcher",
    version,
    about = "Fetch and verify content-addressed proof parameter files",
    long_about = "Downloads the parameter, verifying key and SRS files listed in a manifest into a shared cache,
verifying each against its BLAKE2b digest. Several processes may share one cache directory safely."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Parameter cache directory (overrides FIL_PROOFS_PARAMETER_CACHE)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Gateway base URL (overrides IPFS_GATEWAY)
    #[arg(long, global = true, value_name = "URL")]
    pub gateway: Option<String>,

    /// Disable download progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download missing or corrupted files and verify the cache
    Fetch(ManifestArgs),

    /// Verify cached files without downloading anything
    Verify(ManifestArgs),
}

/// Manifest selection shared by both commands
#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Storage (sector) size, in bytes or with a KiB/MiB/GiB suffix
    #[arg(value_name = "STORAGE_SIZE", value_parser = parse_storage_size)]
    pub storage_size: u64,

    /// Parameter manifest (JSON)
    #[arg(value_name = "PARAMS_JSON")]
    pub params: PathBuf,

    /// SRS manifest (JSON); nothing extra is fetched when omitted
    #[arg(value_name = "SRS_JSON")]
    pub srs: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Determine log level from the verbosity flags, falling back to `configured`
    pub fn log_level(&self, configured: &str) -> String {
        if self.global.quiet {
            "error".to_string()
        } else if self.global.very_verbose {
            "debug".to_string()
        } else if self.global.verbose {
            "info".to_string()
        } else {
            configured.to_string()
        }
    }

    /// Whether progress bars should be drawn
    pub fn show_progress(&self) -> bool {
        !self.global.quiet && !self.global.no_progress
    }
}

/// Parse a storage size such as `2048`, `2KiB`, `512MiB` or `32GiB`
pub fn parse_storage_size(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let number: u64 = digits
        .parse()
        .map_err(|_| format!("invalid storage size '{}'", value))?;
    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "KiB" => 1 << 10,
        "MiB" => 1 << 20,
        "GiB" => 1 << 30,
        "TiB" => 1 << 40,
        other => return Err(format!("unknown storage size unit '{}'", other)),
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("storage size '{}' is too large", value))
}
