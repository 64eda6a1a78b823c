//! Command implementations for the CLI
//!
//! Both commands read the manifests from disk, build a [`Coordinator`] from
//! the resolved configuration and report the outcome on stdout.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::{Coordinator, FetchSession, SignalHandler, VerificationReport};
use crate::cli::args::ManifestArgs;
use crate::cli::progress::BarProgress;
use crate::config::RuntimeConfig;
use crate::errors::{AppError, ManifestError, Result};

/// Empty manifest used when no SRS manifest is given
const EMPTY_MANIFEST: &[u8] = b"{}";

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Fully resolved configuration
    pub runtime: RuntimeConfig,
    /// Draw progress bars for downloads
    pub show_progress: bool,
    /// Suppress non-essential output
    pub quiet: bool,
}

/// Handle the fetch command
pub async fn handle_fetch(args: ManifestArgs, ctx: CommandContext) -> Result<()> {
    let (params, srs) = read_manifests(&args).await?;
    let cache_dir = ctx.runtime.cache.cache_dir();

    let mut coordinator = build_coordinator(&ctx)?;
    if ctx.show_progress {
        coordinator = coordinator.with_progress(Arc::new(BarProgress::new()));
    }

    let cancel = CancellationToken::new();
    let signals = SignalHandler::new(cancel.clone()).setup();

    if !ctx.quiet {
        println!(
            "📥 Fetching parameters for storage size {} into {}",
            args.storage_size,
            cache_dir.display()
        );
    }

    let started = Instant::now();
    let result = coordinator
        .fetch_all(&params, &srs, args.storage_size, &cancel)
        .await;
    signals.abort();

    if cancel.is_cancelled() {
        result?;
        return Err(AppError::generic("Parameter fetch was cancelled"));
    }
    result?;

    if !ctx.quiet {
        println!(
            "✅ All parameter files are present and verified ({:.1}s)",
            started.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

/// Handle the verify command
pub async fn handle_verify(args: ManifestArgs, ctx: CommandContext) -> Result<()> {
    let (params, srs) = read_manifests(&args).await?;
    let cache_dir = ctx.runtime.cache.cache_dir();
    info!("Verifying parameter cache {}", cache_dir.display());

    let coordinator = build_coordinator(&ctx)?;
    let report = coordinator
        .verify_all(&params, &srs, args.storage_size)
        .await?;

    if !ctx.quiet {
        print_report(&cache_dir, &report);
    }

    if report.is_successful() {
        Ok(())
    } else {
        Err(AppError::generic(format!(
            "{} of {} parameter file(s) failed verification",
            report.files_failed, report.files_checked
        )))
    }
}

fn build_coordinator(ctx: &CommandContext) -> Result<Coordinator> {
    Coordinator::new(
        ctx.runtime.coordinator.clone(),
        ctx.runtime.cache.clone(),
        ctx.runtime.client.clone(),
        FetchSession::shared(),
    )
}

async fn read_manifests(args: &ManifestArgs) -> Result<(Vec<u8>, Vec<u8>)> {
    let params = read_manifest(&args.params).await?;
    let srs = match &args.srs {
        Some(path) => read_manifest(path).await?,
        None => EMPTY_MANIFEST.to_vec(),
    };
    Ok((params, srs))
}

async fn read_manifest(path: &Path) -> Result<Vec<u8>> {
    debug!("Reading manifest {}", path.display());
    tokio::fs::read(path).await.map_err(|source| {
        ManifestError::Read {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

fn print_report(cache_dir: &Path, report: &VerificationReport) {
    println!("🔍 Cache Verification: {}", cache_dir.display());
    println!("====================");
    println!("  Files checked: {}", report.files_checked);
    println!("  Verified: {}", report.files_verified);
    println!("  Missing: {}", report.files_missing);
    println!("  Failed: {}", report.files_failed);
    println!("  Success rate: {:.1}%", report.success_rate());
    println!("  Verification time: {:?}", report.verification_time);

    if !report.failed_files.is_empty() {
        println!("\nFailures:");
        for failure in &report.failed_files {
            println!("  • {}: {}", failure.name, failure.error);
        }
    }
}
