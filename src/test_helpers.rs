//! Scripted fake browser for unit tests.
//!
//! [`FakeLauncher`] opens [`FakeSession`]s that emulate the catalog site:
//! a login form, a collection listing, and per-item download pages with a
//! format menu and a download link. Behavior is configured per URL through
//! [`FakeSite`] and every session reports into shared [`FakeStats`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::browser::{
    BrowserLauncher, BrowserResult, BrowserSession, Cookie, LaunchOptions, SessionState,
    scripts, selectors, urls,
};
use crate::config::Config;
use crate::error::BrowserError;
use crate::types::{Credentials, DownloadEvent};

pub(crate) const IDENTITY: &str = "jordan";
pub(crate) const SECRET: &str = "hunter2";

/// Login form behavior
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoginBehavior {
    /// Correct credentials log in
    Accept,
    /// Every submission shows the error marker
    Reject,
    /// Nothing ever appears after submitting
    Hang,
}

/// How a download page's transfer behaves after the link is clicked
#[derive(Clone, Debug)]
pub(crate) enum FakeDownload {
    /// Emit started, progress, then completed after writing the file
    Complete {
        file_name: String,
        contents: Vec<u8>,
        progress: Vec<(u64, u64)>,
    },
    /// Emit started and then nothing, keeping the stream open
    Hang,
    /// Emit started and then close the stream
    Abandon,
}

/// One download page
#[derive(Clone, Debug)]
pub(crate) struct FakePage {
    pub error_visible: bool,
    pub menu_renders: bool,
    pub labels: Vec<String>,
    pub download: FakeDownload,
    pub step_delay: Duration,
}

impl FakePage {
    /// A working page offering `labels` and completing with `file_name`
    pub(crate) fn album(labels: &[&str], file_name: &str) -> Self {
        Self {
            error_visible: false,
            menu_renders: true,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            download: FakeDownload::Complete {
                file_name: file_name.to_string(),
                contents: b"audio".to_vec(),
                progress: vec![(30, 100), (70, 100)],
            },
            step_delay: Duration::from_millis(2),
        }
    }

    /// A page showing the error marker
    pub(crate) fn broken() -> Self {
        Self {
            error_visible: true,
            ..Self::album(&[], "never.zip")
        }
    }

    pub(crate) fn with_download(mut self, download: FakeDownload) -> Self {
        self.download = download;
        self
    }

    pub(crate) fn with_contents(mut self, bytes: Vec<u8>) -> Self {
        if let FakeDownload::Complete { contents, .. } = &mut self.download {
            *contents = bytes;
        }
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub(crate) fn without_menu(mut self) -> Self {
        self.menu_renders = false;
        self
    }
}

/// Site behavior shared by every session of one launcher
#[derive(Clone, Debug)]
pub(crate) struct FakeSite {
    pub login: LoginBehavior,
    pub collection: Option<Value>,
    pub pages: HashMap<String, FakePage>,
    pub close_hangs: bool,
}

impl FakeSite {
    pub(crate) fn new() -> Self {
        Self {
            login: LoginBehavior::Accept,
            collection: Some(json!([])),
            pages: HashMap::new(),
            close_hangs: false,
        }
    }

    pub(crate) fn with_login(mut self, login: LoginBehavior) -> Self {
        self.login = login;
        self
    }

    pub(crate) fn with_collection(mut self, collection: Option<Value>) -> Self {
        self.collection = collection;
        self
    }

    /// Sessions never finish closing
    pub(crate) fn with_hanging_close(mut self) -> Self {
        self.close_hangs = true;
        self
    }

    pub(crate) fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }
}

/// Collection payload rows as the in-page script returns them
pub(crate) fn collection_json(rows: &[(&str, &str, &str)]) -> Value {
    Value::Array(
        rows.iter()
            .map(|(title, creator, link)| {
                json!({ "title": title, "artist": format!("by {creator}"), "link": link })
            })
            .collect(),
    )
}

/// Counters and call logs shared by every session
#[derive(Debug, Default)]
pub(crate) struct FakeStats {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub clicks: Mutex<Vec<String>>,
    pub seeded_launches: AtomicUsize,
}

impl FakeStats {
    pub(crate) fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Launcher for [`FakeSession`]s
pub(crate) struct FakeLauncher {
    site: Arc<FakeSite>,
    pub stats: Arc<FakeStats>,
}

impl FakeLauncher {
    pub(crate) fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            stats: Arc::new(FakeStats::default()),
        }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserSession>> {
        self.stats.launched.fetch_add(1, Ordering::SeqCst);
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);
        if options.session.is_some() {
            self.stats.seeded_launches.fetch_add(1, Ordering::SeqCst);
        }

        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
            stats: Arc::clone(&self.stats),
            current: String::new(),
            logged_in: options.session.is_some(),
            login_rejected: false,
            fields: HashMap::new(),
            menu_open: false,
            hovered: None,
            selected: None,
            download: None,
            held_tx: None,
            closed: false,
        }))
    }
}

/// One fake browsing context
pub(crate) struct FakeSession {
    site: Arc<FakeSite>,
    stats: Arc<FakeStats>,
    current: String,
    logged_in: bool,
    login_rejected: bool,
    fields: HashMap<String, String>,
    menu_open: bool,
    hovered: Option<String>,
    selected: Option<usize>,
    download: Option<(PathBuf, mpsc::Sender<DownloadEvent>)>,
    held_tx: Option<mpsc::Sender<DownloadEvent>>,
    closed: bool,
}

impl FakeSession {
    fn page(&self) -> Option<&FakePage> {
        self.site.pages.get(&self.current)
    }

    fn ensure_open(&self) -> BrowserResult<()> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }

    fn present(&self, selector: &str) -> bool {
        match selector {
            selectors::LOGGED_IN => self.logged_in,
            selectors::COLLECTION => self.logged_in && self.site.collection.is_some(),
            selectors::ERROR_TEXT => {
                self.login_rejected || self.page().is_some_and(|p| p.error_visible)
            }
            selectors::FORMAT_CONTROL => self.page().is_some_and(|p| !p.error_visible),
            selectors::FORMAT_OPTIONS => self.menu_open,
            selectors::DOWNLOAD_LINK => self.selected.is_some(),
            _ => false,
        }
    }

    fn submit_login(&mut self) {
        let identity = self.fields.get(selectors::USERNAME_INPUT).cloned();
        let secret = self.fields.get(selectors::PASSWORD_INPUT).cloned();
        match self.site.login {
            LoginBehavior::Accept
                if identity.as_deref() == Some(IDENTITY) && secret.as_deref() == Some(SECRET) =>
            {
                self.logged_in = true;
            }
            LoginBehavior::Hang => {}
            _ => self.login_rejected = true,
        }
    }

    fn start_download(&mut self) {
        let Some(page) = self.page().cloned() else {
            return;
        };
        let Some((dir, tx)) = self.download.take() else {
            return;
        };
        let url = format!("{}/file", self.current);

        match page.download {
            FakeDownload::Complete {
                file_name,
                contents,
                progress,
            } => {
                tokio::spawn(async move {
                    let _ = tx.send(DownloadEvent::Started { url }).await;
                    for (received_bytes, total_bytes) in progress {
                        tokio::time::sleep(page.step_delay).await;
                        let _ = tx
                            .send(DownloadEvent::Updated {
                                received_bytes,
                                total_bytes,
                            })
                            .await;
                    }
                    tokio::time::sleep(page.step_delay).await;
                    let path = dir.join(&file_name);
                    let bytes = contents.len() as u64;
                    if tokio::fs::create_dir_all(&dir).await.is_ok()
                        && tokio::fs::write(&path, &contents).await.is_ok()
                    {
                        let _ = tx.send(DownloadEvent::Completed { path, bytes }).await;
                    }
                });
            }
            FakeDownload::Hang => {
                let held = tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(DownloadEvent::Started { url }).await;
                });
                self.held_tx = Some(held);
            }
            FakeDownload::Abandon => {
                tokio::spawn(async move {
                    let _ = tx.send(DownloadEvent::Started { url }).await;
                });
            }
        }
    }
}

#[async_trait::async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.stats
            .navigations
            .lock()
            .expect("navigations lock")
            .push(url.to_string());

        if url == urls::LOGOUT {
            self.logged_in = false;
        } else if url != urls::LOGIN && !self.site.pages.contains_key(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "404".to_string(),
            });
        }
        self.current = url.to_string();
        self.menu_open = false;
        self.selected = None;
        self.hovered = None;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        self.ensure_open()?;
        if self.present(selector) {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
            })
        }
    }

    async fn is_visible(&mut self, selector: &str) -> BrowserResult<bool> {
        self.ensure_open()?;
        Ok(self.present(selector))
    }

    async fn click(&mut self, selector: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.stats
            .clicks
            .lock()
            .expect("clicks lock")
            .push(selector.to_string());

        if selector == selectors::SUBMIT_BUTTON {
            self.submit_login();
        } else if selector == selectors::FORMAT_CONTROL {
            self.menu_open = self.page().is_some_and(|p| p.menu_renders);
        } else if selector == selectors::DOWNLOAD_LINK {
            self.start_download();
        } else if self.menu_open && self.hovered.as_deref() == Some(selector) {
            // Options only accept a click after a pointer-enter
            let count = self.page().map_or(0, |p| p.labels.len());
            self.selected = (0..count).find(|i| selectors::format_option(*i) == selector);
        }
        Ok(())
    }

    async fn hover(&mut self, selector: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.hovered = Some(selector.to_string());
        Ok(())
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.stats
            .typed
            .lock()
            .expect("typed lock")
            .push((selector.to_string(), text.to_string()));
        self.fields.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> BrowserResult<Value> {
        self.ensure_open()?;
        match script {
            scripts::COLLECTION_ITEMS => Ok(self.site.collection.clone().unwrap_or(json!([]))),
            scripts::FORMAT_LABELS if self.menu_open => Ok(json!(
                self.page().map(|p| p.labels.clone()).unwrap_or_default()
            )),
            scripts::FORMAT_LABELS => Ok(json!([])),
            other => Err(BrowserError::Script(format!("unknown script: {other}"))),
        }
    }

    async fn download_events(
        &mut self,
        download_dir: &Path,
    ) -> BrowserResult<mpsc::Receiver<DownloadEvent>> {
        self.ensure_open()?;
        let (tx, rx) = mpsc::channel(16);
        self.download = Some((download_dir.to_path_buf(), tx));
        Ok(rx)
    }

    async fn session_state(&mut self) -> BrowserResult<SessionState> {
        self.ensure_open()?;
        let cookies = if self.logged_in {
            vec![Cookie {
                name: "identity".to_string(),
                value: IDENTITY.to_string(),
                domain: ".bandcamp.com".to_string(),
            }]
        } else {
            Vec::new()
        };
        Ok(SessionState { cookies })
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if self.site.close_hangs {
            std::future::pending::<()>().await;
        }
        if self.closed {
            return Err(BrowserError::Closed);
        }
        self.closed = true;
        self.held_tx = None;
        self.download = None;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A valid configuration rooted at `root` with short waits for tests
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::new(Credentials::new(IDENTITY, SECRET));
    config.acquisition.destination_root = root.to_path_buf();
    config.acquisition.per_item_timeout = Duration::from_secs(5);
    config.browser.page_timeout = Duration::from_millis(100);
    config.browser.poll_interval = Duration::from_millis(5);
    config.browser.format_settle = Duration::from_millis(1);
    config
}

/// Detail page URL for test item `n`
pub(crate) fn page_url(n: usize) -> String {
    format!("https://bandcamp.com/download?id={n}")
}
