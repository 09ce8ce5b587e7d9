use crate::error::ExtractionError;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Archive extractor for 7z files
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    /// Extract a 7z archive into `dest_path` (blocking)
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        debug!(?archive_path, ?dest_path, "attempting 7z extraction");

        std::fs::create_dir_all(dest_path).map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to create destination: {}", e))
        })?;

        let mut skipped = 0usize;
        sevenz_rust::decompress_file_with_extract_fn(archive_path, dest_path, |entry, reader, dest| {
            if !is_enclosed(entry.name()) {
                warn!(?archive_path, entry = entry.name(), "skipping 7z entry with unsafe path");
                skipped += 1;
                // Entries share one decoder stream, so the skipped bytes still have to be consumed
                std::io::copy(reader, &mut std::io::sink()).map_err(sevenz_rust::Error::io)?;
                return Ok(true);
            }
            sevenz_rust::default_entry_extract_fn(entry, reader, dest)
        })
        .map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to extract 7z archive: {}", e))
        })?;

        let mut extracted_files = Vec::new();
        Self::collect_extracted_files(archive_path, dest_path, &mut extracted_files)?;
        // The raw archive may live inside the destination; it is not an extracted file
        extracted_files.retain(|f| f != archive_path);

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            skipped,
            "7z extraction successful"
        );
        Ok(extracted_files)
    }

    fn collect_extracted_files(
        archive_path: &Path,
        dir: &Path,
        files: &mut Vec<PathBuf>,
    ) -> Result<(), ExtractionError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ExtractionError::new(archive_path, format!("failed to read directory: {}", e))
        })?;

        for entry in entries {
            let path = entry
                .map_err(|e| {
                    ExtractionError::new(archive_path, format!("failed to read entry: {}", e))
                })?
                .path();

            if path.is_dir() {
                Self::collect_extracted_files(archive_path, &path, files)?;
            } else {
                files.push(path);
            }
        }
        Ok(())
    }
}

/// Whether an entry name stays inside the destination once joined onto it
fn is_enclosed(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
