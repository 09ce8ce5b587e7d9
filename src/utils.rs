//! Utility functions for path naming

use std::path::{Path, PathBuf};

use crate::types::ItemDescriptor;

/// Maximum length of a single path component in bytes
const MAX_COMPONENT_BYTES: usize = 255;

/// Characters that are invalid in file names on at least one supported platform
const INVALID_CHARS: &[char] = &['/', '\\', '?', '<', '>', ':', '*', '|', '"'];

/// Device names reserved on Windows regardless of extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Render an arbitrary label as a single filesystem-safe path component
///
/// Removes path separators, characters reserved on Windows and control
/// characters, trims trailing dots and spaces, and truncates to 255 bytes on
/// a character boundary. Names that end up empty, `.`/`..`, or reserved
/// device names become `_`.
///
/// # Examples
///
/// ```
/// use bandcamp_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC-Back in Black"), "ACDC-Back in Black");
/// assert_eq!(sanitize_filename("What?"), "What");
/// assert_eq!(sanitize_filename(".."), "_");
/// ```
pub fn sanitize_filename(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| !INVALID_CHARS.contains(c) && !c.is_control())
        .collect();

    let mut name = cleaned.trim_end_matches(['.', ' ']).to_string();

    if name.len() > MAX_COMPONENT_BYTES {
        let mut cut = MAX_COMPONENT_BYTES;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
        name = name.trim_end_matches(['.', ' ']).to_string();
    }

    if name.is_empty() || name == "." || name == ".." || is_reserved(&name) {
        return "_".to_string();
    }
    name
}

fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

/// Per-item destination directory: `<root>/<sanitized creator-title>`
pub fn item_directory(root: &Path, item: &ItemDescriptor) -> PathBuf {
    root.join(sanitize_filename(&item.label()))
}
