//! Cancellation and shutdown coordination.

use crate::types::Event;

use super::CollectionDownloader;

impl CollectionDownloader {
    /// Request a graceful stop of the current run
    ///
    /// No further items are admitted; items already being acquired finish
    /// normally and every item that was never admitted is reported as
    /// skipped. Calling this before [`CollectionDownloader::run`] makes the
    /// run return [`crate::Error::ShuttingDown`] without logging in.
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::info!("Initiating graceful shutdown");
        self.cancel.cancel();
        self.emit(Event::Shutdown);
    }

    /// Whether [`CollectionDownloader::shutdown`] has been called
    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
