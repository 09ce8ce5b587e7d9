//! Acquisition context: everything one item's state machine needs, plus its current state.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::browser::{BrowserLauncher, LaunchOptions, SessionState};
use crate::config::Config;
use crate::extraction::Extractor;
use crate::types::{Event, ItemDescriptor};
use crate::utils::item_directory;

use super::state::AcquisitionState;

/// Shared collaborators handed to every acquisition of a run
#[derive(Clone)]
pub(crate) struct AcquisitionServices {
    pub(crate) config: Arc<Config>,
    pub(crate) session_state: Arc<SessionState>,
    pub(crate) launcher: Arc<dyn BrowserLauncher>,
    pub(crate) extractor: Arc<dyn Extractor>,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

/// Per-item context, reducing parameter passing between the machine's steps
pub(crate) struct AcquisitionContext {
    pub(crate) index: usize,
    pub(crate) item: ItemDescriptor,
    pub(crate) services: AcquisitionServices,
    // Readable after the driving future is dropped by the timeout
    state: watch::Sender<AcquisitionState>,
}

impl AcquisitionContext {
    pub(crate) fn new(index: usize, item: ItemDescriptor, services: AcquisitionServices) -> Self {
        let (state, _) = watch::channel(AcquisitionState::Pending);
        Self {
            index,
            item,
            services,
            state,
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.services.config
    }

    /// Launch options for this item's own session, seeded with the run's login
    pub(crate) fn launch_options(&self) -> LaunchOptions {
        LaunchOptions::seeded(
            &self.services.config.browser,
            self.services.session_state.as_ref().clone(),
        )
    }

    /// `<destination_root>/<sanitized creator-title>`
    pub(crate) fn item_dir(&self) -> PathBuf {
        item_directory(self.config().destination_root(), &self.item)
    }

    pub(crate) fn state(&self) -> AcquisitionState {
        *self.state.borrow()
    }

    /// Advance to `next` and emit [`Event::StateChanged`]
    pub(crate) fn transition(&self, next: AcquisitionState) {
        let previous = self.state.send_replace(next);
        debug_assert!(
            previous.can_advance_to(next),
            "illegal acquisition transition {previous} -> {next}"
        );
        tracing::debug!(
            index = self.index,
            item = %self.item.label(),
            from = %previous,
            to = %next,
            "acquisition state changed"
        );
        self.emit(Event::StateChanged {
            index: self.index,
            state: next,
        });
    }

    pub(crate) fn emit(&self, event: Event) {
        self.services.event_tx.send(event).ok();
    }
}
