//! Resumable file downloads with HTTP range requests
//!
//! A partially written file is resumed by requesting `bytes=<len>-` and
//! appending the response body. Progress is surfaced through a
//! [`ProgressReporter`] so the library stays independent of any terminal UI.

use std::fmt;
use std::path::Path;

use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::{DownloadError, DownloadResult};

/// Creates a progress handle for each transfer
pub trait ProgressReporter: Send + Sync + fmt::Debug {
    /// A transfer of `name` starts at byte `offset`; `total` includes the offset
    fn start(&self, name: &str, offset: u64, total: Option<u64>) -> Box<dyn TransferProgress>;
}

/// Progress of one transfer
pub trait TransferProgress: Send {
    /// `bytes` more were written
    fn advance(&mut self, bytes: u64);

    /// The transfer ended, successfully or not
    fn finish(&mut self);
}

/// Reporter that discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _name: &str, _offset: u64, _total: Option<u64>) -> Box<dyn TransferProgress> {
        Box::new(NoProgress)
    }
}

impl TransferProgress for NoProgress {
    fn advance(&mut self, _bytes: u64) {}

    fn finish(&mut self) {}
}

/// Summary of one ranged download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    /// Bytes present before the request (after any restart)
    pub resumed_from: u64,
    /// Bytes appended by this request
    pub bytes_written: u64,
}

/// File download operations handler
pub struct DownloadHandler<'a> {
    client: &'a Client,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP client
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetch `url` into `destination`, resuming from its current length
    ///
    /// - `206 Partial Content` is appended after the existing bytes
    /// - `200 OK` to a non-zero range restarts the file from scratch
    /// - `416 Range Not Satisfiable` appends nothing and succeeds, leaving the
    ///   verdict to the caller's integrity check
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the file cannot be opened or written, the
    /// request fails, the server answers with an error status, or `cancel`
    /// fires mid-transfer.
    pub async fn download(
        &self,
        url: &Url,
        destination: &Path,
        name: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> DownloadResult<TransferSummary> {
        let io_err = |source| DownloadError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(destination)
            .await
            .map_err(io_err)?;
        let mut offset = file.metadata().await.map_err(io_err)?.len();

        info!("GET {} (resuming at byte {})", url, offset);
        let request = self
            .client
            .get(url.clone())
            .header(RANGE, format!("bytes={}-", offset))
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            response = request => response?,
        };

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            debug!(
                "{} already holds {} bytes, nothing left to fetch",
                destination.display(),
                offset
            );
            return Ok(TransferSummary {
                resumed_from: offset,
                bytes_written: 0,
            });
        }
        if !status.is_success() {
            return Err(DownloadError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if offset > 0 && status != StatusCode::PARTIAL_CONTENT {
            warn!(
                "Gateway ignored range request for {}, restarting from byte 0",
                destination.display()
            );
            file.set_len(0).await.map_err(io_err)?;
            offset = 0;
        }

        let total = response.content_length().map(|remaining| offset + remaining);
        let mut bar = progress.start(name, offset, total);
        let result = Self::write_body(response, &mut file, bar.as_mut(), cancel)
            .await
            .map_err(|e| match e {
                BodyError::Download(e) => e,
                BodyError::Io(source) => io_err(source),
            });
        bar.finish();

        let bytes_written = result?;
        debug!(
            "Wrote {} bytes to {} (total {})",
            bytes_written,
            destination.display(),
            offset + bytes_written
        );
        Ok(TransferSummary {
            resumed_from: offset,
            bytes_written,
        })
    }

    async fn write_body(
        response: reqwest::Response,
        file: &mut File,
        progress: &mut dyn TransferProgress,
        cancel: &CancellationToken,
    ) -> Result<u64, BodyError> {
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(BodyError::Download(DownloadError::Cancelled)),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };
            let bytes = chunk.map_err(|e| BodyError::Download(DownloadError::Http(e)))?;
            file.write_all(&bytes).await.map_err(BodyError::Io)?;
            written += bytes.len() as u64;
            progress.advance(bytes.len() as u64);
        }

        file.flush().await.map_err(BodyError::Io)?;
        Ok(written)
    }
}

enum BodyError {
    Download(DownloadError),
    Io(std::io::Error),
}
