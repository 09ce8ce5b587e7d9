//! Core types for bandcamp-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::acquisition::AcquisitionState;
use crate::error::FailureReason;

/// Login identity and secret
///
/// Used once per run to open the authenticated session. The secret is never
/// serialized and is redacted from `Debug` output.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Account username or email
    pub identity: String,

    /// Account password
    #[serde(skip_serializing, default)]
    pub secret: String,
}

impl Credentials {
    /// Create a new credentials pair
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One purchased item as listed in the collection
///
/// Identified within a run by its (title, creator) pair. Serialized with the
/// detail page reference under `link` to match the manifest format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Album or track title
    pub title: String,

    /// Artist name
    pub creator: String,

    /// Detail (download) page of the item
    #[serde(rename = "link")]
    pub detail_url: Url,
}

impl ItemDescriptor {
    /// The `creator-title` label used for logs and directory names
    pub fn label(&self) -> String {
        format!("{}-{}", self.creator, self.title)
    }

    /// Whether this descriptor has the given (title, creator) identity
    pub fn is(&self, title: &str, creator: &str) -> bool {
        self.title == title && self.creator == creator
    }
}

/// Terminal result of acquiring one item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcquisitionOutcome {
    /// The artifact (or its extracted directory) is on disk
    Succeeded {
        /// Downloaded file, or the extraction directory for archives
        local_path: PathBuf,
    },

    /// The item could not be acquired
    Failed {
        /// Machine-readable reason
        reason: FailureReason,
        /// Human-readable detail
        detail: String,
    },

    /// The item was never attempted
    Skipped {
        /// Why the item was skipped
        reason: String,
    },
}

impl AcquisitionOutcome {
    /// Whether this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, AcquisitionOutcome::Succeeded { .. })
    }

    /// Whether this outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, AcquisitionOutcome::Failed { .. })
    }

    /// Build a failure outcome from an acquisition error
    pub fn from_error(error: &crate::error::AcquisitionError) -> Self {
        AcquisitionOutcome::Failed {
            reason: error.reason(),
            detail: error.to_string(),
        }
    }
}

/// An item together with its outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Position among the selected items (manifest order after filtering)
    pub index: usize,
    /// The item
    pub item: ItemDescriptor,
    /// Its terminal outcome
    pub outcome: AcquisitionOutcome,
}

/// Final per-item outcomes of a run, in manifest order
///
/// Holds exactly one entry per scheduled item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Entries in manifest order
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome for an item, looked up by its (title, creator) identity
    pub fn outcome_for(&self, item: &ItemDescriptor) -> Option<&AcquisitionOutcome> {
        self.entries
            .iter()
            .find(|e| e.item.is(&item.title, &item.creator))
            .map(|e| &e.outcome)
    }

    /// Number of succeeded items
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    /// Number of failed items
    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failure()).count()
    }

    /// Number of skipped items
    pub fn skipped(&self) -> usize {
        self.entries.len() - self.succeeded() - self.failed()
    }

    /// Entries whose outcome is a failure
    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }
}

/// Browser download lifecycle event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// Transfer started from the actual byte source
    Started {
        /// Byte-source URL
        url: String,
    },

    /// Periodic progress
    Updated {
        /// Bytes received so far
        received_bytes: u64,
        /// Total bytes (0 when unknown)
        total_bytes: u64,
    },

    /// Transfer finished and the file is on disk
    Completed {
        /// Final local file path
        path: PathBuf,
        /// Final size in bytes
        bytes: u64,
    },
}

/// Event emitted during a collection run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Authenticated session established
    LoggedIn {
        /// Account identity
        identity: String,
    },

    /// Collection listing extracted
    CollectionEnumerated {
        /// Number of well-formed items
        items: usize,
        /// Number of malformed nodes skipped
        malformed: usize,
    },

    /// Item filter applied
    ItemsFiltered {
        /// Pattern used (None = no filtering)
        pattern: Option<String>,
        /// Number of items kept
        matched: usize,
        /// Number of items before filtering
        total: usize,
        /// `creator-title` labels of the kept items
        labels: Vec<String>,
    },

    /// Manifest written
    ManifestRecorded {
        /// Manifest file path
        path: PathBuf,
    },

    /// An item was admitted to an acquisition slot
    ItemStarted {
        /// Manifest index
        index: usize,
        /// Item title
        title: String,
        /// Item creator
        creator: String,
    },

    /// The item's state machine changed state
    StateChanged {
        /// Manifest index
        index: usize,
        /// New state
        state: AcquisitionState,
    },

    /// Browser started the transfer
    DownloadStarted {
        /// Manifest index
        index: usize,
        /// Byte-source URL
        url: String,
    },

    /// Transfer progress
    DownloadProgress {
        /// Manifest index
        index: usize,
        /// Bytes received so far
        received_bytes: u64,
        /// Total bytes (0 when unknown)
        total_bytes: u64,
        /// Progress percentage (0.0 to 100.0) when total is known
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<f32>,
    },

    /// Transfer finished
    DownloadCompleted {
        /// Manifest index
        index: usize,
        /// Downloaded file
        path: PathBuf,
        /// Size in bytes
        bytes: u64,
    },

    /// Archive extraction started
    Extracting {
        /// Manifest index
        index: usize,
        /// Archive path
        archive: PathBuf,
    },

    /// An item reached its terminal outcome
    ItemSettled {
        /// Manifest index
        index: usize,
        /// Items settled so far (including this one)
        completed: usize,
        /// Items scheduled in total
        total: usize,
        /// The item's outcome
        outcome: AcquisitionOutcome,
    },

    /// Final report written
    ReportRecorded {
        /// Report file path
        path: PathBuf,
    },

    /// Every item settled
    RunComplete {
        /// Succeeded items
        succeeded: usize,
        /// Failed items
        failed: usize,
        /// Skipped items
        skipped: usize,
    },

    /// Cancellation requested
    Shutdown,
}
