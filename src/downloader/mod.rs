//! Collection downloader split into focused submodules:
//! - [`run`] - The run pipeline (authenticate → enumerate → filter → record → acquire → report)
//! - [`lifecycle`] - Cancellation and shutdown coordination

mod lifecycle;
mod run;


use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserLauncher;
use crate::config::Config;
use crate::error::{FailureReason, Result};
use crate::extraction::{ArchiveExtractor, Extractor};
use crate::types::{AcquisitionOutcome, Event, RunReport};

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Downloads a purchased collection (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct CollectionDownloader {
    /// Validated configuration
    pub(crate) config: Arc<Config>,
    /// Opens every browser session of a run
    pub(crate) launcher: Arc<dyn BrowserLauncher>,
    /// Unpacks downloaded archives
    pub(crate) extractor: Arc<dyn Extractor>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cancelled by [`CollectionDownloader::shutdown`]
    pub(crate) cancel: CancellationToken,
}

impl CollectionDownloader {
    /// Create a downloader
    ///
    /// The configuration is validated here so a bad setting is reported
    /// before any browser session is opened.
    pub fn new(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            launcher,
            extractor: Arc::new(ArchiveExtractor),
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the default ZIP/7z extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to run events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls more than 1000 events behind receives `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example(downloader: bandcamp_dl::CollectionDownloader) {
    /// use bandcamp_dl::Event;
    ///
    /// let mut events = downloader.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         if let Event::ItemSettled { completed, total, .. } = event {
    ///             println!("{completed}/{total}");
    ///         }
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// Result of a completed run
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Manifest written before acquisition
    pub manifest_path: PathBuf,
    /// Final report
    pub report_path: PathBuf,
    /// Collection nodes skipped as malformed during enumeration
    pub malformed: usize,
    /// Per-item outcomes in manifest order
    pub report: RunReport,
}

/// One failed item, for user-facing reporting
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFailure<'a> {
    /// Item creator
    pub creator: &'a str,
    /// Item title
    pub title: &'a str,
    /// Reason code
    pub reason: FailureReason,
    /// Human-readable detail
    pub detail: &'a str,
}

impl std::fmt::Display for ItemFailure<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}: {} ({})",
            self.creator, self.title, self.reason, self.detail
        )
    }
}

impl RunSummary {
    /// Failed items with creator, title and reason
    pub fn failures(&self) -> Vec<ItemFailure<'_>> {
        self.report
            .failures()
            .filter_map(|entry| match &entry.outcome {
                AcquisitionOutcome::Failed { reason, detail } => Some(ItemFailure {
                    creator: &entry.item.creator,
                    title: &entry.item.title,
                    reason: *reason,
                    detail,
                }),
                _ => None,
            })
            .collect()
    }
}
