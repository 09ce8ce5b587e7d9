//! # bandcamp-dl
//!
//! Acquisition orchestrator for a purchased Bandcamp collection.
//!
//! ## Design Philosophy
//!
//! bandcamp-dl is designed to be:
//! - **Browser-agnostic** - Every page interaction goes through the [`BrowserLauncher`] and
//!   [`BrowserSession`] traits, so any automation engine can drive the site
//! - **Failure-isolated** - One item failing never stops the others; every item settles
//!   with a recorded outcome
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bandcamp_dl::{BrowserLauncher, CollectionDownloader, Config};
//!
//! async fn download(launcher: Arc<dyn BrowserLauncher>) -> Result<(), Box<dyn std::error::Error>> {
//!     // NB_USER, NB_PASS and friends
//!     let config = Config::from_env()?;
//!     let downloader = CollectionDownloader::new(config, launcher)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader.run().await?;
//!     for failure in summary.failures() {
//!         eprintln!("{failure}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Per-item acquisition state machine
pub mod acquisition;
/// Login
pub mod auth;
/// Browser automation capability
pub mod browser;
/// Collection enumeration
pub mod collection;
/// Configuration types
pub mod config;
/// Run orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Item filtering
pub mod filter;
/// Manifest, outcome and report files
pub mod recorder;
mod scheduler;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use acquisition::{AcquisitionState, select_format};
pub use browser::{BrowserLauncher, BrowserSession, LaunchOptions, SessionState};
pub use config::{AcquisitionOptions, BrowserConfig, Config};
pub use downloader::{CollectionDownloader, ItemFailure, RunSummary};
pub use error::{
    AcquisitionError, AuthError, BrowserError, Error, ExtractionError, FailureReason, Result,
    ScrapeError, Stage,
};
pub use extraction::{ArchiveExtractor, Extractor};
pub use filter::ItemFilter;
pub use scheduler::CANCELLED_REASON;
pub use types::{
    AcquisitionOutcome, Credentials, DownloadEvent, Event, ItemDescriptor, ReportEntry, RunReport,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Runs [`CollectionDownloader::run`] while waiting for a termination signal.
/// On a signal the downloader's `shutdown()` is called and the run keeps
/// going until the items already in flight settle, so the report is still
/// written.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bandcamp_dl::{BrowserLauncher, CollectionDownloader, Config, run_with_shutdown};
///
/// async fn download(launcher: Arc<dyn BrowserLauncher>) -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = CollectionDownloader::new(Config::from_env()?, launcher)?;
///
///     // Run with automatic signal handling
///     let summary = run_with_shutdown(downloader).await?;
///     println!("{} succeeded", summary.report.succeeded());
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: CollectionDownloader) -> Result<RunSummary> {
    let run = downloader.run();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => return result,
        _ = wait_for_signal() => downloader.shutdown(),
    }

    run.await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
