//! Acquisition states and their legal order.

use serde::{Deserialize, Serialize};

/// Position of one item in the acquisition protocol
///
/// The happy path is strictly linear:
/// `Pending → Navigated → FormatMenuOpen → FormatSelected → DownloadTriggered
/// → DownloadComplete → (ExtractComplete) → Succeeded`.
/// `Failed` is reachable from every non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionState {
    /// Session is being opened, nothing loaded yet
    Pending,
    /// Detail page loaded and validated
    Navigated,
    /// Format option list rendered
    FormatMenuOpen,
    /// Preferred format chosen
    FormatSelected,
    /// Download link clicked
    DownloadTriggered,
    /// Artifact is on disk
    DownloadComplete,
    /// Archive unpacked into the item directory
    ExtractComplete,
    /// Terminal success
    Succeeded,
    /// Terminal failure
    Failed,
}

impl AcquisitionState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, AcquisitionState::Succeeded | AcquisitionState::Failed)
    }

    /// Whether `self → next` is a legal transition
    pub fn can_advance_to(self, next: AcquisitionState) -> bool {
        use AcquisitionState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Navigated)
                | (Navigated, FormatMenuOpen)
                | (FormatMenuOpen, FormatSelected)
                | (FormatSelected, DownloadTriggered)
                | (DownloadTriggered, DownloadComplete)
                | (DownloadComplete, ExtractComplete)
                | (DownloadComplete, Succeeded)
                | (ExtractComplete, Succeeded)
        )
    }

    /// Stable snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            AcquisitionState::Pending => "pending",
            AcquisitionState::Navigated => "navigated",
            AcquisitionState::FormatMenuOpen => "format_menu_open",
            AcquisitionState::FormatSelected => "format_selected",
            AcquisitionState::DownloadTriggered => "download_triggered",
            AcquisitionState::DownloadComplete => "download_complete",
            AcquisitionState::ExtractComplete => "extract_complete",
            AcquisitionState::Succeeded => "succeeded",
            AcquisitionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
