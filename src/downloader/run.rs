//! Run pipeline: one collection run from login to final report.

use std::sync::Arc;

use crate::acquisition::AcquisitionServices;
use crate::auth::authenticate;
use crate::browser::{BrowserSession, SessionState, close_quietly};
use crate::collection::{Enumeration, enumerate};
use crate::error::{Error, Result};
use crate::filter::{ItemFilter, filter_items};
use crate::recorder::Recorder;
use crate::scheduler::Scheduler;
use crate::types::Event;

use super::{CollectionDownloader, RunSummary};

impl CollectionDownloader {
    /// Run the whole pipeline once
    ///
    /// Phases:
    /// 1. Authenticate (fatal on failure)
    /// 2. Enumerate the collection and export the login state, then close the login session
    /// 3. Write the manifest of every enumerated item
    /// 4. Apply the item filter to it
    /// 5. Acquire every item under the concurrency limit
    /// 6. Write the report
    ///
    /// Per-item failures never make this return an error; only setup
    /// failures (authentication, enumeration, recording) do.
    pub async fn run(&self) -> Result<RunSummary> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        let filter = self
            .config
            .filter
            .as_deref()
            .map(ItemFilter::new)
            .transpose()?;
        let recorder = Arc::new(Recorder::new(self.config.destination_root()));

        // Phase 1-2: login session is used for enumeration only
        let mut session = authenticate(
            self.launcher.as_ref(),
            &self.config.credentials,
            &self.config.browser,
        )
        .await?;
        self.emit(Event::LoggedIn {
            identity: self.config.credentials.identity.clone(),
        });

        let scraped = self.scrape(session.as_mut()).await;
        close_quietly(session.as_mut(), "collection").await;
        let (enumeration, session_state) = scraped?;

        self.emit(Event::CollectionEnumerated {
            items: enumeration.items.len(),
            malformed: enumeration.malformed.len(),
        });
        let malformed = enumeration.malformed.len();

        // Phase 3: the manifest is the whole collection as enumerated
        let manifest_path = recorder.record_manifest(&enumeration.items).await?;
        self.emit(Event::ManifestRecorded {
            path: manifest_path.clone(),
        });

        // Phase 4
        let total = enumeration.items.len();
        let items = filter_items(enumeration.items, filter.as_ref());
        self.emit(Event::ItemsFiltered {
            pattern: filter.as_ref().map(|f| f.as_str().to_string()),
            matched: items.len(),
            total,
            labels: items.iter().map(|i| i.label()).collect(),
        });

        // Phase 5
        let services = AcquisitionServices {
            config: Arc::clone(&self.config),
            session_state: Arc::new(session_state),
            launcher: Arc::clone(&self.launcher),
            extractor: Arc::clone(&self.extractor),
            event_tx: self.event_tx.clone(),
        };
        let scheduler = Scheduler::new(services, Arc::clone(&recorder), self.cancel.clone());
        let report = scheduler.run(&items).await;

        // Phase 6
        let report_path = recorder.record_report(&report).await?;
        self.emit(Event::ReportRecorded {
            path: report_path.clone(),
        });
        self.emit(Event::RunComplete {
            succeeded: report.succeeded(),
            failed: report.failed(),
            skipped: report.skipped(),
        });

        let summary = RunSummary {
            manifest_path,
            report_path,
            malformed,
            report,
        };
        for failure in summary.failures() {
            tracing::warn!(%failure, "Item not acquired");
        }
        tracing::info!(
            succeeded = summary.report.succeeded(),
            failed = summary.report.failed(),
            skipped = summary.report.skipped(),
            "Run complete"
        );
        Ok(summary)
    }

    async fn scrape(&self, session: &mut dyn BrowserSession) -> Result<(Enumeration, SessionState)> {
        let enumeration = enumerate(session, &self.config.browser).await?;
        let state = session.session_state().await?;
        Ok((enumeration, state))
    }
}
