//! Manifest and result recorder.
//!
//! All files of one run share a single Unix timestamp prefix (milliseconds)
//! under the destination root:
//! - `<ts>-collection.json`: the manifest, written once before acquisition
//! - `<ts>-outcomes.jsonl`: one line per settled item, in completion order
//! - `<ts>-report.json`: the final report in manifest order

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::{ItemDescriptor, ReportEntry, RunReport};

/// Persists the run's manifest, per-item outcomes and final report
#[derive(Debug)]
pub struct Recorder {
    root: PathBuf,
    timestamp: i64,
    // Append point shared by concurrently settling items
    outcomes: Mutex<Option<tokio::fs::File>>,
}

#[derive(Serialize)]
struct ReportFile<'a> {
    timestamp: i64,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    entries: &'a [ReportEntry],
}

impl Recorder {
    /// Recorder for a run starting now
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_timestamp(root, chrono::Utc::now().timestamp_millis())
    }

    /// Recorder with an explicit run timestamp in Unix milliseconds
    pub fn with_timestamp(root: impl Into<PathBuf>, timestamp: i64) -> Self {
        Self {
            root: root.into(),
            timestamp,
            outcomes: Mutex::new(None),
        }
    }

    /// Run timestamp shared by every file of the run
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// `<root>/<ts>-collection.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(format!("{}-collection.json", self.timestamp))
    }

    /// `<root>/<ts>-outcomes.jsonl`
    pub fn outcomes_path(&self) -> PathBuf {
        self.root.join(format!("{}-outcomes.jsonl", self.timestamp))
    }

    /// `<root>/<ts>-report.json`
    pub fn report_path(&self) -> PathBuf {
        self.root.join(format!("{}-report.json", self.timestamp))
    }

    /// Write the manifest as a JSON array of `{title, creator, link}`
    pub async fn record_manifest(&self, items: &[ItemDescriptor]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.manifest_path();
        let json = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&path, json).await?;
        info!(path = %path.display(), items = items.len(), "Recorded manifest");
        Ok(path)
    }

    /// Append one settled item as a JSON line
    pub async fn append_outcome(&self, entry: &ReportEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut guard = self.outcomes.lock().await;
        let file = match guard.take() {
            Some(file) => file,
            None => {
                tokio::fs::create_dir_all(&self.root).await?;
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.outcomes_path())
                    .await?
            }
        };
        let file = guard.insert(file);
        file.write_all(&line).await?;
        file.flush().await?;
        debug!(index = entry.index, "Appended outcome");
        Ok(())
    }

    /// Write the final report with succeeded/failed/skipped counts
    pub async fn record_report(&self, report: &RunReport) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.report_path();
        let file = ReportFile {
            timestamp: self.timestamp,
            succeeded: report.succeeded(),
            failed: report.failed(),
            skipped: report.skipped(),
            entries: &report.entries,
        };
        tokio::fs::write(&path, serde_json::to_vec_pretty(&file)?).await?;
        info!(
            path = %path.display(),
            succeeded = file.succeeded,
            failed = file.failed,
            skipped = file.skipped,
            "Recorded report"
        );
        Ok(path)
    }
}

/// Read a manifest written by [`Recorder::record_manifest`]
pub async fn read_manifest(path: &Path) -> Result<Vec<ItemDescriptor>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
