//! Archive extraction
//!
//! Downloads that arrive as ZIP or 7z archives are unpacked into the item's
//! destination directory. Extraction is exposed as the [`Extractor`]
//! capability so the acquisition state machine can be driven with a
//! substitute; [`ArchiveExtractor`] is the default implementation.

mod sevenz;
mod shared;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use sevenz::SevenZipExtractor;
pub use shared::{ArchiveType, detect_archive_type, is_archive};
pub use zip::ZipExtractor;

use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Opaque `extract(archive, dest_dir)` capability
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Unpack `archive` into `dest_dir`, returning the extracted files
    ///
    /// Must never delete `archive`, whether extraction succeeds or fails.
    async fn extract(&self, archive: &Path, dest_dir: &Path)
    -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Default extractor for ZIP and 7z archives
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveExtractor;

#[async_trait::async_trait]
impl Extractor for ArchiveExtractor {
    async fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let archive_type = detect_archive_type(archive).ok_or_else(|| {
            ExtractionError::new(
                archive,
                format!("unknown archive type for file: {}", archive.display()),
            )
        })?;

        info!(?archive, ?archive_type, "extracting archive");

        match archive_type {
            ArchiveType::SevenZip => {
                shared::extract_blocking("7z", SevenZipExtractor::extract, archive, dest_dir).await
            }
            ArchiveType::Zip => {
                shared::extract_blocking("ZIP", ZipExtractor::extract, archive, dest_dir).await
            }
        }
    }
}
