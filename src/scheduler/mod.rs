//! Bounded concurrency scheduler.
//!
//! Admits items in manifest order, at most `concurrency_limit` at a time.
//! Every admitted item settles into exactly one outcome whatever happens to
//! its siblings; a panicking acquisition settles as `Failed{internal_error}`.
//! Cancellation stops admission and settles the remaining items as
//! `Skipped`, while in-flight acquisitions run to completion.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::acquisition::{AcquisitionContext, AcquisitionServices, run_acquisition};
use crate::error::FailureReason;
use crate::recorder::Recorder;
use crate::types::{AcquisitionOutcome, Event, ItemDescriptor, ReportEntry, RunReport};

/// Reason recorded for items never admitted because the run was cancelled
pub const CANCELLED_REASON: &str = "run cancelled";

/// Runs acquisitions under a concurrency limit and collects a [`RunReport`]
pub(crate) struct Scheduler {
    services: AcquisitionServices,
    recorder: Arc<Recorder>,
    cancel: CancellationToken,
}

/// Settled outcomes by manifest index plus progress bookkeeping
struct Settlement<'a> {
    items: &'a [ItemDescriptor],
    outcomes: Vec<Option<AcquisitionOutcome>>,
    completed: usize,
}

impl Scheduler {
    pub(crate) fn new(
        services: AcquisitionServices,
        recorder: Arc<Recorder>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            services,
            recorder,
            cancel,
        }
    }

    /// Acquire every item and return one report entry per item, in manifest order
    pub(crate) async fn run(&self, items: &[ItemDescriptor]) -> RunReport {
        let limit = self.services.config.acquisition.concurrency_limit.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks: JoinSet<AcquisitionOutcome> = JoinSet::new();
        let mut running: HashMap<tokio::task::Id, usize> = HashMap::new();
        let mut settlement = Settlement {
            items,
            outcomes: vec![None; items.len()],
            completed: 0,
        };

        info!(items = items.len(), concurrency_limit = limit, "Starting acquisition");

        let mut queue = items.iter().enumerate();
        let mut next = queue.next();

        loop {
            let admitting = next.is_some() && !self.cancel.is_cancelled();

            tokio::select! {
                biased;

                _ = self.cancel.cancelled(), if admitting => {
                    warn!(in_flight = tasks.len(), "Run cancelled, no further items will be admitted");
                }

                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    let (index, outcome) = match joined {
                        Ok((id, outcome)) => (running.remove(&id), outcome),
                        Err(e) => (running.remove(&e.id()), panicked(e)),
                    };
                    match index {
                        Some(index) => self.settle(&mut settlement, index, outcome).await,
                        None => error!("Finished acquisition task was not tracked"),
                    }
                }

                permit = semaphore.clone().acquire_owned(), if admitting => {
                    let Ok(permit) = permit else { break };
                    let Some((index, item)) = next else { continue };
                    next = queue.next();

                    let ctx = AcquisitionContext::new(index, item.clone(), self.services.clone());
                    self.services
                        .event_tx
                        .send(Event::ItemStarted {
                            index,
                            title: item.title.clone(),
                            creator: item.creator.clone(),
                        })
                        .ok();
                    debug!(index, item = %item.label(), "Admitted item");

                    let handle = tasks.spawn(async move {
                        let _permit = permit;
                        run_acquisition(&ctx).await
                    });
                    running.insert(handle.id(), index);
                }

                else => break,
            }
        }

        // Anything still queued was never admitted
        while let Some((index, _)) = next {
            let outcome = AcquisitionOutcome::Skipped {
                reason: CANCELLED_REASON.to_string(),
            };
            self.settle(&mut settlement, index, outcome).await;
            next = queue.next();
        }

        let report = settlement.into_report();
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Acquisition finished"
        );
        report
    }

    async fn settle(&self, settlement: &mut Settlement<'_>, index: usize, outcome: AcquisitionOutcome) {
        let entry = ReportEntry {
            index,
            item: settlement.items[index].clone(),
            outcome,
        };

        if let Err(e) = self.recorder.append_outcome(&entry).await {
            warn!(index, error = %e, "Failed to append outcome");
        }

        settlement.completed += 1;
        let total = settlement.items.len();
        info!(
            index,
            item = %entry.item.label(),
            completed = settlement.completed,
            total,
            "Item settled"
        );
        self.services
            .event_tx
            .send(Event::ItemSettled {
                index,
                completed: settlement.completed,
                total,
                outcome: entry.outcome.clone(),
            })
            .ok();

        settlement.outcomes[index] = Some(entry.outcome);
    }
}

impl Settlement<'_> {
    fn into_report(self) -> RunReport {
        let entries = self
            .items
            .iter()
            .zip(self.outcomes)
            .enumerate()
            .map(|(index, (item, outcome))| ReportEntry {
                index,
                item: item.clone(),
                outcome: outcome.unwrap_or_else(|| AcquisitionOutcome::Failed {
                    reason: FailureReason::Internal,
                    detail: "no outcome recorded".to_string(),
                }),
            })
            .collect();
        RunReport { entries }
    }
}

fn panicked(e: tokio::task::JoinError) -> AcquisitionOutcome {
    let detail = if e.is_panic() {
        let payload = e.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "acquisition task panicked".to_string())
    } else {
        "acquisition task was cancelled".to_string()
    };
    error!(%detail, "Acquisition task did not complete");
    AcquisitionOutcome::Failed {
        reason: FailureReason::Internal,
        detail,
    }
}
