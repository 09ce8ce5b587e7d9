//! Acquisition state machine: drives one item from detail page to file on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{info, warn};

use crate::browser::{BrowserSession, close_quietly, scripts, selectors};
use crate::error::{AcquisitionError, BrowserError};
use crate::extraction::is_archive;
use crate::types::{AcquisitionOutcome, Event};

use super::context::AcquisitionContext;
use super::download::await_download;
use super::state::AcquisitionState;

/// Acquire one item and return its terminal outcome
///
/// Phases:
/// 1. Launch this item's own session and drive it from navigation to the
///    completed download
/// 2. Close the session on every exit path, bounded by `page_timeout`
/// 3. Extract archives into the item directory
/// 4. Settle into `Succeeded` or `Failed`
///
/// Phases 1 and 3 share one deadline of `per_item_timeout` from the start;
/// missing it is `DownloadTimeout` naming the last state reached. A
/// blocking extraction that overruns keeps its thread until it returns,
/// but the item settles at the deadline.
///
/// Never returns an error: every failure is folded into the outcome.
pub(crate) async fn run_acquisition(ctx: &AcquisitionContext) -> AcquisitionOutcome {
    let label = ctx.item.label();
    let item_dir = ctx.item_dir();
    let per_item_timeout = ctx.config().acquisition.per_item_timeout;
    let deadline = Instant::now() + per_item_timeout;

    info!(index = ctx.index, item = %label, url = %ctx.item.detail_url, "acquiring item");

    let mut session: Option<Box<dyn BrowserSession>> = None;
    let driven = timeout_at(deadline, launch_and_drive(ctx, &mut session, &item_dir)).await;

    if let Some(session) = session.as_mut() {
        release(ctx, session.as_mut(), &label).await;
    }

    let result = match driven {
        Ok(Ok(artifact)) => timeout_at(deadline, finish(ctx, artifact, &item_dir))
            .await
            .unwrap_or_else(|_| Err(timed_out(ctx, per_item_timeout))),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(timed_out(ctx, per_item_timeout)),
    };

    settle(ctx, result)
}

fn timed_out(ctx: &AcquisitionContext, after: Duration) -> AcquisitionError {
    AcquisitionError::DownloadTimeout {
        after,
        last_state: ctx.state().to_string(),
    }
}

/// Close the item's session, giving up after `page_timeout`
async fn release(ctx: &AcquisitionContext, session: &mut dyn BrowserSession, label: &str) {
    let limit = ctx.config().browser.page_timeout;
    if timeout(limit, close_quietly(session, label)).await.is_err() {
        warn!(
            index = ctx.index,
            item = %label,
            waited = ?limit,
            "browser session did not close in time, abandoning it"
        );
    }
}

async fn launch_and_drive(
    ctx: &AcquisitionContext,
    slot: &mut Option<Box<dyn BrowserSession>>,
    item_dir: &Path,
) -> Result<PathBuf, AcquisitionError> {
    let session = slot.insert(ctx.services.launcher.launch(&ctx.launch_options()).await?);
    drive(ctx, session.as_mut(), item_dir).await
}

/// Navigate → select format → trigger → await completion
async fn drive(
    ctx: &AcquisitionContext,
    session: &mut dyn BrowserSession,
    item_dir: &Path,
) -> Result<PathBuf, AcquisitionError> {
    let config = ctx.config();
    let url = ctx.item.detail_url.as_str();

    session.navigate(url).await?;
    if session.is_visible(selectors::ERROR_TEXT).await? {
        return Err(AcquisitionError::InvalidDetailPage {
            url: url.to_string(),
        });
    }
    ctx.transition(AcquisitionState::Navigated);

    let preferred = &config.acquisition.preferred_format;
    open_format_menu(session, config.browser.page_timeout, preferred).await?;
    ctx.transition(AcquisitionState::FormatMenuOpen);

    let labels = format_labels(session).await?;
    let Some(choice) = select_format(&labels, preferred) else {
        return Err(AcquisitionError::FormatUnavailable {
            preferred: preferred.clone(),
            available: labels,
        });
    };
    info!(index = ctx.index, format = %labels[choice], "selecting format");

    // The option widget ignores clicks until it has seen a pointer-enter
    let option = selectors::format_option(choice);
    session.hover(&option).await?;
    session.click(&option).await?;
    tokio::time::sleep(config.browser.format_settle).await;
    ctx.transition(AcquisitionState::FormatSelected);

    let events = session.download_events(item_dir).await?;
    session
        .wait_for_selector(selectors::DOWNLOAD_LINK, config.browser.page_timeout)
        .await?;
    session.click(selectors::DOWNLOAD_LINK).await?;
    ctx.transition(AcquisitionState::DownloadTriggered);

    let (path, _bytes) = await_download(ctx, events).await?;
    ctx.transition(AcquisitionState::DownloadComplete);
    Ok(path)
}

async fn open_format_menu(
    session: &mut dyn BrowserSession,
    page_timeout: Duration,
    preferred: &str,
) -> Result<(), AcquisitionError> {
    let unavailable = |e: BrowserError| match e {
        BrowserError::Timeout { .. } => AcquisitionError::FormatUnavailable {
            preferred: preferred.to_string(),
            available: Vec::new(),
        },
        other => AcquisitionError::Browser(other),
    };

    session
        .wait_for_selector(selectors::FORMAT_CONTROL, page_timeout)
        .await
        .map_err(unavailable)?;
    session.hover(selectors::FORMAT_CONTROL).await?;
    session.click(selectors::FORMAT_CONTROL).await?;
    session
        .wait_for_selector(selectors::FORMAT_OPTIONS, page_timeout)
        .await
        .map_err(unavailable)?;
    Ok(())
}

async fn format_labels(session: &mut dyn BrowserSession) -> Result<Vec<String>, AcquisitionError> {
    let value = session.evaluate(scripts::FORMAT_LABELS).await?;
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect()),
        other => Err(AcquisitionError::Browser(BrowserError::Script(format!(
            "format labels: expected an array, got {other}"
        )))),
    }
}

/// Index of the first option whose label contains `preferred`
///
/// Substring, case-sensitive: labels carry extra metadata such as
/// `"MP3 320 (lossy)"`. No fallback to a default option.
pub fn select_format(labels: &[String], preferred: &str) -> Option<usize> {
    labels.iter().position(|label| label.contains(preferred))
}

async fn finish(
    ctx: &AcquisitionContext,
    artifact: PathBuf,
    item_dir: &Path,
) -> Result<PathBuf, AcquisitionError> {
    if !ctx.config().acquisition.extract_archives || !is_archive(&artifact) {
        return Ok(artifact);
    }

    ctx.emit(Event::Extracting {
        index: ctx.index,
        archive: artifact.clone(),
    });
    let files = ctx.services.extractor.extract(&artifact, item_dir).await?;
    info!(
        index = ctx.index,
        archive = %artifact.display(),
        extracted = files.len(),
        "archive extracted"
    );
    ctx.transition(AcquisitionState::ExtractComplete);
    Ok(item_dir.to_path_buf())
}

fn settle(ctx: &AcquisitionContext, result: Result<PathBuf, AcquisitionError>) -> AcquisitionOutcome {
    match result {
        Ok(local_path) => {
            ctx.transition(AcquisitionState::Succeeded);
            info!(
                index = ctx.index,
                item = %ctx.item.label(),
                path = %local_path.display(),
                "item acquired"
            );
            AcquisitionOutcome::Succeeded { local_path }
        }
        Err(e) => {
            ctx.transition(AcquisitionState::Failed);
            warn!(
                index = ctx.index,
                item = %ctx.item.label(),
                reason = %e.reason(),
                error = %e,
                "item failed"
            );
            AcquisitionOutcome::from_error(&e)
        }
    }
}
