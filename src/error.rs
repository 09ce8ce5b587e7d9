//! Error types for bandcamp-dl
//!
//! This module provides the error taxonomy for a collection run:
//! - Fatal setup errors ([`AuthError`], [`ScrapeError::PageNotReady`], configuration)
//!   that end the run before any item is acquired
//! - Per-item errors ([`AcquisitionError`]) that are captured into an item's outcome
//!   and never propagate past the item boundary
//! - Stage attribution and machine-readable reason codes for user-facing reports

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for bandcamp-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bandcamp-dl
///
/// Only errors that end a run are represented here. Per-item failures are
/// recorded as [`crate::types::AcquisitionOutcome::Failed`] instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "NB_USER")
        key: Option<String>,
    },

    /// The item filter pattern does not compile
    #[error("invalid filter pattern {pattern:?}: {message}")]
    Filter {
        /// The pattern as given
        pattern: String,
        /// Why it was rejected
        message: String,
    },

    /// Authentication failed
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Collection enumeration failed
    #[error("collection enumeration failed: {0}")]
    Scrape(#[from] ScrapeError),

    /// Browser capability failed outside of any item
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Run was cancelled before logging in
    #[error("shutdown in progress: run cancelled before login")]
    ShuttingDown,
}

/// Errors raised while opening the authenticated session
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login page showed its error marker after submitting credentials
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Neither the logged-in marker nor the error marker appeared in time
    #[error("logged-in marker did not appear within {waited:?}")]
    Timeout {
        /// How long the authenticator waited
        waited: Duration,
    },

    /// The browser failed while driving the login form
    #[error("browser failure during login: {0}")]
    Browser(#[from] BrowserError),
}

/// Errors raised while extracting the collection listing
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The collection container never appeared
    #[error("collection container {selector} not present after {waited:?}")]
    PageNotReady {
        /// Selector that was awaited
        selector: String,
        /// How long the enumerator waited
        waited: Duration,
    },

    /// One item node lacked a required sub-element (recovered locally)
    #[error("item #{index} is malformed: missing {missing}")]
    MalformedItem {
        /// Position of the node in DOM order
        index: usize,
        /// Name of the missing or invalid field
        missing: &'static str,
    },

    /// The in-page extraction returned something other than a list of items
    #[error("unexpected collection payload: {0}")]
    InvalidPayload(String),

    /// The browser failed while reading the collection
    #[error("browser failure during enumeration: {0}")]
    Browser(#[from] BrowserError),
}

/// Errors returned by a browser capability implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserError {
    /// A bounded wait for a selector expired
    #[error("timed out after {waited:?} waiting for {selector}")]
    Timeout {
        /// Selector that was awaited
        selector: String,
        /// How long the session waited
        waited: Duration,
    },

    /// Navigation to a URL failed
    #[error("failed to navigate to {url}: {reason}")]
    Navigation {
        /// Target URL
        url: String,
        /// The reason navigation failed
        reason: String,
    },

    /// An in-page script failed or returned an unusable value
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// The session was already closed
    #[error("browser session closed")]
    Closed,

    /// Any other engine-level failure
    #[error("{0}")]
    Other(String),
}

/// Archive extraction failure (the raw archive is always left in place)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("extraction failed for {archive}: {reason}")]
pub struct ExtractionError {
    /// The archive that failed to extract
    pub archive: PathBuf,
    /// The reason extraction failed
    pub reason: String,
}

impl ExtractionError {
    /// Create an extraction error for an archive
    pub fn new(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from acquiring a single item
///
/// These are recovered at the item boundary and converted into an
/// [`crate::types::AcquisitionOutcome::Failed`].
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The detail page showed its error marker
    #[error("detail page {url} is not a valid download page")]
    InvalidDetailPage {
        /// The detail page URL
        url: String,
    },

    /// No format option matched the preferred format
    #[error("format {preferred:?} not offered (available: {available:?})")]
    FormatUnavailable {
        /// The preferred format label fragment
        preferred: String,
        /// Option labels that were offered
        available: Vec<String>,
    },

    /// The per-item timeout expired before the download completed
    #[error("download did not complete within {after:?} (last state: {last_state})")]
    DownloadTimeout {
        /// The configured per-item timeout
        after: Duration,
        /// The last state reached before the timeout
        last_state: String,
    },

    /// The downloaded archive could not be extracted
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The download event stream ended without a completion event
    #[error("download interrupted: {0}")]
    DownloadInterrupted(String),

    /// The browser capability failed
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Machine-readable failure reason recorded in an item outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Detail page showed its error marker
    InvalidDetailPage,
    /// Preferred format not offered
    FormatUnavailable,
    /// No completion within the per-item timeout
    DownloadTimeout,
    /// Archive extraction failed
    ExtractionError,
    /// Download stream ended without completion
    DownloadInterrupted,
    /// Browser capability failure
    #[serde(rename = "browser_error")]
    Browser,
    /// The acquisition task panicked
    #[serde(rename = "internal_error")]
    Internal,
}

impl FailureReason {
    /// Stable snake_case code for this reason
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidDetailPage => "invalid_detail_page",
            FailureReason::FormatUnavailable => "format_unavailable",
            FailureReason::DownloadTimeout => "download_timeout",
            FailureReason::ExtractionError => "extraction_error",
            FailureReason::DownloadInterrupted => "download_interrupted",
            FailureReason::Browser => "browser_error",
            FailureReason::Internal => "internal_error",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AcquisitionError {
    /// The reason code recorded in the item's outcome
    pub fn reason(&self) -> FailureReason {
        match self {
            AcquisitionError::InvalidDetailPage { .. } => FailureReason::InvalidDetailPage,
            AcquisitionError::FormatUnavailable { .. } => FailureReason::FormatUnavailable,
            AcquisitionError::DownloadTimeout { .. } => FailureReason::DownloadTimeout,
            AcquisitionError::Extraction(_) => FailureReason::ExtractionError,
            AcquisitionError::DownloadInterrupted(_) => FailureReason::DownloadInterrupted,
            AcquisitionError::Browser(_) => FailureReason::Browser,
        }
    }
}

/// Stage of a run at which a fatal error occurred
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Loading or validating configuration
    Configure,
    /// Logging in
    Authenticate,
    /// Reading the collection
    Enumerate,
    /// Applying the item filter
    Filter,
    /// Writing manifest or report
    Record,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::Authenticate => "authenticate",
            Stage::Enumerate => "enumerate",
            Stage::Filter => "filter",
            Stage::Record => "record",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// The stage this error is attributed to
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config { .. } => Stage::Configure,
            Error::Filter { .. } => Stage::Filter,
            Error::Auth(_) | Error::ShuttingDown => Stage::Authenticate,
            Error::Scrape(_) => Stage::Enumerate,
            Error::Browser(_) => Stage::Authenticate,
            Error::Io(_) | Error::Serialization(_) => Stage::Record,
        }
    }

    /// Machine-readable reason code
    pub fn reason_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Filter { .. } => "invalid_filter",
            Error::Auth(e) => match e {
                AuthError::InvalidCredentials => "invalid_credentials",
                AuthError::Timeout { .. } => "auth_timeout",
                AuthError::Browser(_) => "auth_browser_error",
            },
            Error::Scrape(e) => match e {
                ScrapeError::PageNotReady { .. } => "page_not_ready",
                ScrapeError::MalformedItem { .. } => "malformed_item",
                ScrapeError::InvalidPayload(_) => "invalid_payload",
                ScrapeError::Browser(_) => "scrape_browser_error",
            },
            Error::Browser(_) => "browser_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ShuttingDown => "shutting_down",
        }
    }

    /// One-line report of a fatal error: stage, reason code and message
    pub fn report(&self) -> String {
        format!("{} failed ({}): {}", self.stage(), self.reason_code(), self)
    }
}
