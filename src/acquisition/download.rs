//! Download lifecycle stream consumption.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::AcquisitionError;
use crate::types::{DownloadEvent, Event};

use super::context::AcquisitionContext;

/// Consume `started → updated* → completed` and return the saved file
///
/// A stream that closes before `Completed` is a
/// [`AcquisitionError::DownloadInterrupted`]. Waiting for `Completed` is
/// bounded by the caller's per-item timeout, not here.
pub(super) async fn await_download(
    ctx: &AcquisitionContext,
    mut events: mpsc::Receiver<DownloadEvent>,
) -> Result<(PathBuf, u64), AcquisitionError> {
    let mut started = false;

    while let Some(event) = events.recv().await {
        match event {
            DownloadEvent::Started { url } => {
                info!(index = ctx.index, item = %ctx.item.label(), %url, "download started");
                started = true;
                ctx.emit(Event::DownloadStarted {
                    index: ctx.index,
                    url,
                });
            }
            DownloadEvent::Updated {
                received_bytes,
                total_bytes,
            } => {
                let percent = progress_percent(received_bytes, total_bytes);
                debug!(
                    index = ctx.index,
                    received_bytes,
                    total_bytes,
                    percent = percent.map(|p| format!("{p:.1}%")).unwrap_or_default(),
                    "download progress"
                );
                ctx.emit(Event::DownloadProgress {
                    index: ctx.index,
                    received_bytes,
                    total_bytes,
                    percent,
                });
            }
            DownloadEvent::Completed { path, bytes } => {
                info!(index = ctx.index, path = %path.display(), bytes, "download completed");
                ctx.emit(Event::DownloadCompleted {
                    index: ctx.index,
                    path: path.clone(),
                    bytes,
                });
                return Ok((path, bytes));
            }
        }
    }

    Err(AcquisitionError::DownloadInterrupted(if started {
        "download stream closed before completion".to_string()
    } else {
        "download stream closed before the transfer started".to_string()
    }))
}

/// Percentage of `received` over `total`, or `None` when the total is unknown
pub(super) fn progress_percent(received: u64, total: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some(((received as f64 / total as f64) * 100.0).min(100.0) as f32)
}
