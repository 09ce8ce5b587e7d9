use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Open a ZIP entry by index
    fn open_zip_entry<'a>(
        archive: &'a mut zip::ZipArchive<std::fs::File>,
        index: usize,
        archive_path: &Path,
    ) -> Result<zip::read::ZipFile<'a>, ExtractionError> {
        archive.by_index(index).map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("password") || err_str.contains("encrypted") {
                ExtractionError::new(archive_path, "archive is password protected")
            } else {
                ExtractionError::new(archive_path, format!("failed to read ZIP entry: {}", e))
            }
        })
    }

    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>, ExtractionError> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(?archive_path, "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| {
                ExtractionError::new(archive_path, format!("failed to create directory: {}", e))
            })?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExtractionError::new(
                    archive_path,
                    format!("failed to create parent directories: {}", e),
                )
            })?;
        }

        let mut outfile = std::fs::File::create(&file_path).map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to create output file: {}", e))
        })?;

        std::io::copy(&mut file, &mut outfile).map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to extract file: {}", e))
        })?;

        Ok(Some(file_path))
    }

    /// Extract a ZIP archive into `dest_path` (blocking)
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        std::fs::create_dir_all(dest_path).map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to create destination: {}", e))
        })?;

        let file = std::fs::File::open(archive_path).map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to open ZIP archive: {}", e))
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to read ZIP archive: {}", e))
        })?;

        let mut extracted_files = Vec::new();
        for i in 0..archive.len() {
            let file = Self::open_zip_entry(&mut archive, i, archive_path)?;
            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}
