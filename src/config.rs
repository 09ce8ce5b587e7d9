//! Configuration types for bandcamp-dl

use crate::error::{Error, Result};
use crate::types::Credentials;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Per-item acquisition settings (format, destination, concurrency, timeout)
///
/// Read-only during a run and shared by every acquisition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionOptions {
    /// Label fragment of the format to download, matched as a substring
    /// (default: "MP3 320"). Offered labels include "MP3 V0", "MP3 320",
    /// "FLAC", "AAC", "Ogg Vorbis", "ALAC", "WAV" and "AIFF".
    #[serde(default = "default_preferred_format")]
    pub preferred_format: String,

    /// Root directory for the manifest, report and per-item directories
    /// (default: ".bandcamp-dl")
    #[serde(default = "default_destination_root")]
    pub destination_root: PathBuf,

    /// Maximum acquisitions in flight at once (default: 1)
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Bound on one item's browser-driven acquisition (default: 600 seconds)
    #[serde(default = "default_per_item_timeout", with = "duration_serde")]
    pub per_item_timeout: Duration,

    /// Extract downloaded archives into the item directory (default: true)
    #[serde(default = "default_true")]
    pub extract_archives: bool,
}

impl Default for AcquisitionOptions {
    fn default() -> Self {
        Self {
            preferred_format: default_preferred_format(),
            destination_root: default_destination_root(),
            concurrency_limit: default_concurrency_limit(),
            per_item_timeout: default_per_item_timeout(),
            extract_archives: true,
        }
    }
}

/// Browser session settings shared by the login session and every item session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// User agent presented by every session
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Show the browser window (debug/visible mode)
    #[serde(default)]
    pub show: bool,

    /// Bounded wait for page markers: login marker, collection container,
    /// format menu (default: 30 seconds)
    #[serde(default = "default_page_timeout", with = "duration_serde")]
    pub page_timeout: Duration,

    /// Interval between marker checks while waiting for login (default: 250ms)
    #[serde(default = "default_poll_interval", with = "millis_serde")]
    pub poll_interval: Duration,

    /// Pause after choosing a format before the download link is awaited (default: 1500ms)
    #[serde(default = "default_format_settle", with = "millis_serde")]
    pub format_settle: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            show: false,
            page_timeout: default_page_timeout(),
            poll_interval: default_poll_interval(),
            format_settle: default_format_settle(),
        }
    }
}

/// Main configuration for a collection run
///
/// Sub-configs are flattened so the serialized form stays a single flat object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Login credentials (the secret is never serialized)
    pub credentials: Credentials,

    /// Acquisition settings
    #[serde(flatten)]
    pub acquisition: AcquisitionOptions,

    /// Browser settings
    #[serde(flatten)]
    pub browser: BrowserConfig,

    /// Optional regex matched against title or creator
    #[serde(default)]
    pub filter: Option<String>,
}

/// Environment variable holding the account identity
pub const ENV_USER: &str = "NB_USER";
/// Environment variable holding the account secret
pub const ENV_PASS: &str = "NB_PASS";
/// Environment variable holding the destination root
pub const ENV_DEST: &str = "NB_DEST";
/// Environment variable holding the preferred format
pub const ENV_FORMAT: &str = "NB_FORMAT";
/// Environment variable holding the concurrency limit
pub const ENV_CONCURRENT: &str = "NB_CONCURRENT";
/// Environment variable enabling the visible browser
pub const ENV_SHOW: &str = "NB_SHOW";
/// Environment variable holding the filter pattern
pub const ENV_FILTER: &str = "NB_FILTER";
/// Environment variable holding the per-item timeout in seconds
pub const ENV_TIMEOUT: &str = "NB_TIMEOUT";

impl Config {
    /// Build a configuration from credentials with every other setting defaulted
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Default::default()
        }
    }

    /// Destination root directory
    pub fn destination_root(&self) -> &PathBuf {
        &self.acquisition.destination_root
    }

    /// Load configuration from `NB_*` environment variables
    ///
    /// `NB_USER` and `NB_PASS` are required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config(format!("{key} is not set"), key))
        };

        let mut config = Config::new(Credentials::new(required(ENV_USER)?, required(ENV_PASS)?));

        if let Some(dest) = lookup(ENV_DEST) {
            config.acquisition.destination_root = PathBuf::from(dest);
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            config.acquisition.preferred_format = format;
        }
        if let Some(raw) = lookup(ENV_CONCURRENT) {
            config.acquisition.concurrency_limit = parse_number(ENV_CONCURRENT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            config.acquisition.per_item_timeout =
                Duration::from_secs(parse_number(ENV_TIMEOUT, &raw)?);
        }
        if let Some(raw) = lookup(ENV_SHOW) {
            config.browser.show = matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        config.filter = lookup(ENV_FILTER).filter(|p| !p.is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Check every setting a run depends on
    pub fn validate(&self) -> Result<()> {
        if self.credentials.identity.trim().is_empty() {
            return Err(Error::config("identity must not be empty", "identity"));
        }
        if self.credentials.secret.is_empty() {
            return Err(Error::config("secret must not be empty", "secret"));
        }
        if self.acquisition.preferred_format.trim().is_empty() {
            return Err(Error::config(
                "preferred format must not be empty",
                "preferred_format",
            ));
        }
        if self.acquisition.concurrency_limit == 0 {
            return Err(Error::config(
                "concurrency limit must be at least 1",
                "concurrency_limit",
            ));
        }
        if self.acquisition.per_item_timeout.is_zero() {
            return Err(Error::config(
                "per-item timeout must be positive",
                "per_item_timeout",
            ));
        }
        if self.browser.page_timeout.is_zero() {
            return Err(Error::config(
                "page timeout must be positive",
                "page_timeout",
            ));
        }
        if let Some(pattern) = &self.filter {
            crate::filter::ItemFilter::new(pattern)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::config(format!("{key}={raw:?} is not a number: {e}"), key))
}

fn default_preferred_format() -> String {
    "MP3 320".to_string()
}

fn default_destination_root() -> PathBuf {
    PathBuf::from(".bandcamp-dl")
}

fn default_concurrency_limit() -> usize {
    1
}

fn default_per_item_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}

fn default_page_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_format_settle() -> Duration {
    Duration::from_millis(1500)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
