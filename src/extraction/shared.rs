use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

/// Archive formats that can be unpacked after download
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveType {
    /// 7z archive
    SevenZip,
    /// ZIP archive
    Zip,
}

/// Detect archive type by file extension
pub fn detect_archive_type(path: &Path) -> Option<ArchiveType> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    match ext.as_str() {
        "7z" => Some(ArchiveType::SevenZip),
        "zip" => Some(ArchiveType::Zip),
        _ => None,
    }
}

/// Check if a downloaded artifact is an archive we know how to extract
pub fn is_archive(path: &Path) -> bool {
    detect_archive_type(path).is_some()
}

/// Run a blocking extractor off the async runtime
///
/// A panic inside the extractor becomes an [`ExtractionError`] for the archive.
pub(crate) async fn extract_blocking(
    format_name: &str,
    extract_fn: fn(&Path, &Path) -> Result<Vec<PathBuf>, ExtractionError>,
    archive_path: &Path,
    dest_path: &Path,
) -> Result<Vec<PathBuf>, ExtractionError> {
    debug!(?archive_path, ?dest_path, "dispatching {} extraction", format_name);

    let archive_path_owned = archive_path.to_path_buf();
    let dest_path_owned = dest_path.to_path_buf();

    let result = spawn_blocking(move || extract_fn(&archive_path_owned, &dest_path_owned))
        .await
        .map_err(|e| {
            ExtractionError::new(archive_path, format!("extraction task panicked: {}", e))
        })?;

    if let Err(e) = &result {
        warn!(?archive_path, error = %e, "{} extraction failed", format_name);
    }
    result
}
