//! HTTP client for the parameter gateway
//!
//! The module is organized into specialized components:
//! - `config`: gateway location and HTTP client building
//! - `download`: resumable range downloads with progress reporting

use std::path::Path;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::DownloadResult;

pub mod config;
pub mod download;

pub use config::ClientConfig;
pub use download::{NoProgress, ProgressReporter, TransferProgress, TransferSummary};

use download::DownloadHandler;

/// Client that fetches artifacts by content id from a gateway
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    config: ClientConfig,
}

impl GatewayClient {
    /// Creates a client for the configured gateway
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the gateway URL does not parse or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> DownloadResult<Self> {
        config.artifact_url("")?;
        let client = config.build_http_client()?;

        info!("Using parameter gateway {}", config.gateway);
        Ok(Self { client, config })
    }

    /// Fetch artifact `content_id` into `destination`, resuming a partial file
    ///
    /// # Errors
    ///
    /// See [`DownloadHandler::download`].
    pub async fn download_artifact(
        &self,
        content_id: &str,
        destination: &Path,
        name: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> DownloadResult<TransferSummary> {
        let url = self.config.artifact_url(content_id)?;
        info!("Fetching {} from {}", destination.display(), url);

        DownloadHandler::new(&self.client)
            .download(&url, destination, name, progress, cancel)
            .await
    }
}
