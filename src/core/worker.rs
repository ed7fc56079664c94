//! Running passes from async code
//!
//! Passes are blocking and single-threaded. [`run_pass`] moves one onto
//! tokio's blocking pool, and [`cancel_on_shutdown`] trips a
//! [`CancellationToken`] when the shutdown channel flips to `true`, so a
//! running pass stops at its next checkpoint.
//!
//! # Example
//!
//! ```no_run
//! use strata::core::progress::{CancellationToken, LoggingProgress};
//! use strata::core::store::Storage;
//! use strata::core::worker::{cancel_on_shutdown, run_pass, shutdown_signal};
//! use strata::config::StrataConfig;
//! use strata::domain::SpecName;
//!
//! # async fn example() -> strata::domain::Result<()> {
//! let storage = Storage::open(&StrataConfig::default())?;
//! let dataset = storage.dataset(&SpecName::new("museum").unwrap())?;
//! let token = CancellationToken::new();
//! let _watcher = cancel_on_shutdown(token.clone(), shutdown_signal());
//!
//! let summary = run_pass(move || {
//!     dataset.convert(&mut LoggingProgress::new("convert"), token)
//! })
//! .await?;
//! println!("{} records", summary.record_count);
//! # Ok(())
//! # }
//! ```

use crate::core::progress::CancellationToken;
use crate::domain::{Result, StrataError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Runs a blocking pass on the blocking thread pool
pub async fn run_pass<T, F>(pass: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(pass)
        .await
        .map_err(|e| StrataError::Worker(e.to_string()))?
}

/// Cancels `token` once `shutdown` becomes `true`
///
/// The task ends without cancelling when the sender is dropped.
pub fn cancel_on_shutdown(
    token: CancellationToken,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *shutdown.borrow_and_update() {
                tracing::info!("Shutdown requested, cancelling running pass");
                token.cancel();
                return;
            }
            if shutdown.changed().await.is_err() {
                return;
            }
        }
    })
}

/// Shutdown channel fed by SIGINT (and SIGTERM on unix)
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                }
            }
            let _ = shutdown_tx.send(true);
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                let _ = shutdown_tx.send(true);
            }
        }
    });
    shutdown_rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_pass_returns_value() {
        let value = run_pass(|| Ok(42u64)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_pass_propagates_error() {
        let result: Result<()> = run_pass(|| Err(StrataError::Cancelled)).await;
        assert!(matches!(result, Err(StrataError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_pass_panic_is_worker_error() {
        let result: Result<()> = run_pass(|| panic!("boom")).await;
        assert!(matches!(result, Err(StrataError::Worker(_))));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_token() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let token = CancellationToken::new();
        let watcher = cancel_on_shutdown(token.clone(), shutdown_rx);
        assert!(!token.is_cancelled());

        shutdown_tx.send(true).unwrap();
        watcher.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_sender_does_not_cancel() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let token = CancellationToken::new();
        let watcher = cancel_on_shutdown(token.clone(), shutdown_rx);
        drop(shutdown_tx);
        watcher.await.unwrap();
        assert!(!token.is_cancelled());
    }
}
