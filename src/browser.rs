//! Browser capability used to drive the catalog site
//!
//! The site offers no stable API, so every interaction goes through a small
//! browser-automation surface: navigate, wait for a selector, click, hover,
//! type, evaluate a script in the page, and listen for downloads. The engine
//! behind it is supplied by the caller as a [`BrowserLauncher`]; the
//! authenticator, enumerator and acquisition state machine only ever see
//! [`BrowserSession`] trait objects, which keeps them testable against fakes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::BrowserConfig;
use crate::error::BrowserError;
use crate::types::DownloadEvent;

/// Result type for browser capability calls
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// A cookie exported from an authenticated session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Cookie domain
    pub domain: String,
}

/// Authenticated browsing state used to seed new sessions
///
/// Exported once from the login session; each item session starts from a copy
/// so no live handle is ever shared between concurrent acquisitions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Session cookies
    pub cookies: Vec<Cookie>,
}

/// Options for opening a new session
#[derive(Clone, Debug, Default)]
pub struct LaunchOptions {
    /// User agent presented by the session
    pub user_agent: String,
    /// Show the browser window
    pub show: bool,
    /// Authenticated state to start from (None = fresh session)
    pub session: Option<SessionState>,
}

impl LaunchOptions {
    /// Launch options for a fresh (not yet authenticated) session
    pub fn fresh(config: &BrowserConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            show: config.show,
            session: None,
        }
    }

    /// Launch options for a session seeded with authenticated state
    pub fn seeded(config: &BrowserConfig, state: SessionState) -> Self {
        Self {
            session: Some(state),
            ..Self::fresh(config)
        }
    }
}

/// Opens isolated browser sessions
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Open a new session with its own browsing context
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// One isolated browsing context
///
/// Sessions are owned by exactly one component at a time and must be closed
/// by their owner on every exit path.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    /// Navigate to a URL and wait for the page load
    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Wait until an element matching `selector` is present
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration)
    -> BrowserResult<()>;

    /// Whether an element matching `selector` is present and visible
    async fn is_visible(&mut self, selector: &str) -> BrowserResult<bool>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> BrowserResult<()>;

    /// Dispatch a synthetic pointer-enter on the first element matching `selector`
    async fn hover(&mut self, selector: &str) -> BrowserResult<()>;

    /// Replace the value of an input with `text` (empty text clears it)
    async fn type_into(&mut self, selector: &str, text: &str) -> BrowserResult<()>;

    /// Evaluate a script in the page and return its JSON result
    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Arm the download listener, saving files into `download_dir`
    ///
    /// Returns the finite lifecycle stream of the next download:
    /// `Started`, zero or more `Updated`, then `Completed`. The stream closes
    /// after `Completed` or when the engine abandons the download.
    async fn download_events(
        &mut self,
        download_dir: &Path,
    ) -> BrowserResult<mpsc::Receiver<DownloadEvent>>;

    /// Export the session's authenticated state
    async fn session_state(&mut self) -> BrowserResult<SessionState>;

    /// Release the session
    async fn close(&mut self) -> BrowserResult<()>;
}

/// Close a session, logging instead of propagating a failure
pub(crate) async fn close_quietly(session: &mut dyn BrowserSession, owner: &str) {
    if let Err(e) = session.close().await {
        tracing::warn!(owner, error = %e, "Failed to close browser session");
    }
}

/// Site URLs
pub mod urls {
    /// Login page
    pub const LOGIN: &str = "https://bandcamp.com/login";
    /// Logout endpoint, visited first to clear a stale session
    pub const LOGOUT: &str = "https://bandcamp.com/logout";
}

/// CSS selectors for the catalog site
pub mod selectors {
    /// Login identity input
    pub const USERNAME_INPUT: &str = "#username-field";
    /// Login secret input
    pub const PASSWORD_INPUT: &str = "#password-field";
    /// Login submit button
    pub const SUBMIT_BUTTON: &str = "button[type=submit]";
    /// Error marker on the login page and on invalid download pages
    pub const ERROR_TEXT: &str = ".error-text";
    /// Marker that exists only on the authenticated collection view
    pub const LOGGED_IN: &str = "#collection-container";
    /// Collection listing container
    pub const COLLECTION: &str = ".collection-items";
    /// One item node inside the collection
    pub const COLLECTION_ITEM: &str = ".collection-item-container";
    /// Format selection control on a download page
    pub const FORMAT_CONTROL: &str = ".format-type";
    /// Rendered format option list
    pub const FORMAT_OPTIONS: &str = "ul.formats li";
    /// Download link shown once a format has been prepared
    pub const DOWNLOAD_LINK: &str = ".download-title a";

    /// Selector for the format option at `index` (0-based)
    pub fn format_option(index: usize) -> String {
        format!("ul.formats li:nth-child({})", index + 1)
    }
}

/// In-page scripts evaluated through [`BrowserSession::evaluate`]
pub mod scripts {
    /// Returns `[{title, artist, link}]` for every collection item in DOM order.
    /// Missing sub-elements yield `null` fields.
    pub const COLLECTION_ITEMS: &str = r#"Array.from(document.querySelectorAll('.collection-item-container')).map(item => {
    const text = sel => { const el = item.querySelector(sel); return el ? el.innerText : null; };
    const link = item.querySelector('.redownload-item a');
    return { title: text('.collection-item-title'), artist: text('.collection-item-artist'), link: link ? link.href : null };
})"#;

    /// Returns the visible label of every format option in list order
    pub const FORMAT_LABELS: &str = r#"Array.from(document.querySelectorAll('ul.formats li')).map(li => {
    const d = li.querySelector('.description');
    return (d ? d.textContent : li.textContent).trim();
})"#;
}
