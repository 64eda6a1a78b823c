//! Signal handling for cancellation
//!
//! This module turns system signals (CTRL-C, SIGTERM, SIGHUP) into a
//! cancellation of the token passed to the fetch coordinator, so in-flight
//! tasks stop waiting on locks and streams and release their files.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels a token when the process is asked to stop
pub struct SignalHandler {
    cancel: CancellationToken,
}

impl SignalHandler {
    /// Create a handler that cancels `cancel`
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Spawn the signal watcher
    ///
    /// The task exits after the first signal, or when the token is cancelled
    /// by someone else.
    pub fn setup(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    error!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = unix_signal(signal::unix::SignalKind::terminate(), "SIGTERM");
            #[cfg(unix)]
            let hangup = unix_signal(signal::unix::SignalKind::hangup(), "SIGHUP");

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();
            #[cfg(not(unix))]
            let hangup = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling parameter fetch");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling parameter fetch");
                },
                _ = hangup => {
                    info!("Received hangup signal, cancelling parameter fetch");
                },
                _ = cancel.cancelled() => return,
            }

            cancel.cancel();
        })
    }
}

#[cfg(unix)]
async fn unix_signal(kind: signal::unix::SignalKind, label: &str) {
    match signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!("Failed to install {} handler: {}", label, e);
            std::future::pending::<()>().await;
        }
    }
}
