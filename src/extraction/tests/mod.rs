use crate::extraction::*;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a valid ZIP archive containing the given files
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
}

/// Create a valid 7z archive from a source directory using sevenz_rust
fn create_7z_archive(archive_path: &Path, source_dir: &Path) {
    sevenz_rust::compress_to_path(source_dir, archive_path).unwrap();
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[test]
fn test_detect_archive_type() {
    assert_eq!(
        detect_archive_type(Path::new("album.zip")),
        Some(ArchiveType::Zip)
    );
    assert_eq!(
        detect_archive_type(Path::new("album.ZIP")),
        Some(ArchiveType::Zip)
    );
    assert_eq!(
        detect_archive_type(Path::new("album.7z")),
        Some(ArchiveType::SevenZip)
    );
    assert_eq!(detect_archive_type(Path::new("track.mp3")), None);
    assert_eq!(detect_archive_type(Path::new("album.rar")), None);
    assert_eq!(detect_archive_type(Path::new("no_extension")), None);
}

#[test]
fn test_is_archive() {
    assert!(is_archive(Path::new("/music/X-A/X - A.zip")));
    assert!(!is_archive(Path::new("/music/X-A/01 Intro.flac")));
}

// ---------------------------------------------------------------------------
// ZIP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_zip_extracts_nested_entries() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("album.zip");
    create_zip_archive(
        &archive,
        &[
            ("01 Intro.mp3", b"intro"),
            ("artwork/cover.jpg", b"jpeg"),
        ],
    );

    let files = ArchiveExtractor
        .extract(&archive, temp_dir.path())
        .await
        .unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(
        std::fs::read(temp_dir.path().join("01 Intro.mp3")).unwrap(),
        b"intro"
    );
    assert_eq!(
        std::fs::read(temp_dir.path().join("artwork/cover.jpg")).unwrap(),
        b"jpeg"
    );
    assert!(archive.exists(), "archive is kept after extraction");
}

#[tokio::test]
async fn test_zip_corrupt_archive_fails_and_keeps_file() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip archive").unwrap();

    let err = ArchiveExtractor
        .extract(&archive, &temp_dir.path().join("out"))
        .await
        .unwrap_err();

    assert_eq!(err.archive, archive);
    assert!(err.reason.contains("failed to read ZIP archive"));
    assert!(archive.exists(), "raw archive is preserved for manual recovery");
}

#[test]
fn test_zip_skips_unsafe_paths() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("evil.zip");
    create_zip_archive(&archive, &[("../escape.txt", b"nope"), ("ok.txt", b"ok")]);
    let dest = temp_dir.path().join("dest");

    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("ok.txt")]);
    assert!(!temp_dir.path().join("escape.txt").exists());
}

// ---------------------------------------------------------------------------
// 7z
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_7z_extracts_into_destination() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("01 Track.flac"), b"flac data").unwrap();

    let archive = temp_dir.path().join("album.7z");
    create_7z_archive(&archive, &source);
    let dest = temp_dir.path().join("dest");

    let files = ArchiveExtractor.extract(&archive, &dest).await.unwrap();

    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("01 Track.flac"));
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"flac data");
}

#[test]
fn test_7z_does_not_list_archive_in_destination() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("track.ogg"), b"ogg").unwrap();

    let item_dir = temp_dir.path().join("item");
    std::fs::create_dir_all(&item_dir).unwrap();
    let archive = item_dir.join("album.7z");
    create_7z_archive(&archive, &source);

    let files = SevenZipExtractor::extract(&archive, &item_dir).unwrap();

    assert!(files.iter().all(|f| f != &archive));
    assert!(files.iter().any(|f| f.ends_with("track.ogg")));
    assert!(archive.exists());
}

#[test]
fn test_7z_skips_unsafe_paths_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let payload = temp_dir.path().join("payload.txt");
    std::fs::write(&payload, b"nope").unwrap();

    let archive = temp_dir.path().join("evil.7z");
    let mut writer = sevenz_rust::SevenZWriter::create(&archive).unwrap();
    for name in ["../escape.txt", "ok.txt"] {
        writer
            .push_archive_entry(
                sevenz_rust::SevenZArchiveEntry::from_path(&payload, name.to_string()),
                Some(std::fs::File::open(&payload).unwrap()),
            )
            .unwrap();
    }
    writer.finish().unwrap();
    let dest = temp_dir.path().join("nested").join("dest");

    let files = SevenZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("ok.txt")]);
    assert_eq!(std::fs::read(dest.join("ok.txt")).unwrap(), b"nope");
    assert!(!temp_dir.path().join("nested").join("escape.txt").exists());
}

#[tokio::test]
async fn test_7z_corrupt_archive_fails() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("broken.7z");
    std::fs::write(&archive, b"not a 7z").unwrap();

    let err = ArchiveExtractor
        .extract(&archive, &temp_dir.path().join("out"))
        .await
        .unwrap_err();

    assert!(err.reason.contains("failed to extract 7z archive"));
    assert!(archive.exists());
}

#[tokio::test]
async fn test_unknown_type_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("track.mp3");
    std::fs::write(&file, b"mp3").unwrap();

    let err = ArchiveExtractor
        .extract(&file, temp_dir.path())
        .await
        .unwrap_err();

    assert!(err.reason.contains("unknown archive type"));
}
