//! Runs items through a processor with a bound on how many are in flight.
//!
//! Each item gets a tokio task that waits for a semaphore permit and then does
//! the blocking filesystem work on the blocking pool. The permit moves into the
//! blocking closure, so it is held exactly as long as the item is processed.

use crate::item::MediaItem;
use crate::pipeline::{ItemProcessor, ProcessingOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const SHUTDOWN_REASON: &str = "shutdown requested";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item: MediaItem,
    pub outcome: ProcessingOutcome,
}

pub struct Dispatcher {
    processor: Arc<dyn ItemProcessor>,
    permits: Arc<Semaphore>,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(processor: Arc<dyn ItemProcessor>, max_concurrent: usize) -> Self {
        Self {
            processor,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an existing flag, e.g. one set from a signal handler
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Stop starting new items; items already running finish normally
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub async fn submit(&self, item: MediaItem) -> ProcessingOutcome {
        let mut reports = self.run_batch(vec![item]).await;
        reports.pop().map_or_else(
            || ProcessingOutcome::Failed {
                reason: "dispatch task failed".to_string(),
            },
            |report| report.outcome,
        )
    }

    /// Process every item and report outcomes in submission order
    pub async fn run_batch(&self, items: Vec<MediaItem>) -> Vec<ItemReport> {
        let total = items.len();
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let permits = Arc::clone(&self.permits);
            let shutdown = Arc::clone(&self.shutdown);
            let processor = Arc::clone(&self.processor);

            tasks.spawn(async move {
                let Ok(permit) = permits.acquire_owned().await else {
                    return (
                        index,
                        item,
                        ProcessingOutcome::Failed {
                            reason: "dispatcher closed".to_string(),
                        },
                    );
                };

                if shutdown.load(Ordering::SeqCst) {
                    tracing::info!("Not starting {}: {}", item, SHUTDOWN_REASON);
                    return (
                        index,
                        item,
                        ProcessingOutcome::Failed {
                            reason: SHUTDOWN_REASON.to_string(),
                        },
                    );
                }

                let work_item = item.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    processor.process(&work_item)
                })
                .await;

                let outcome = joined.unwrap_or_else(|e| {
                    tracing::error!("Worker for {} panicked: {}", item, e);
                    ProcessingOutcome::Failed {
                        reason: format!("worker panicked: {e}"),
                    }
                });
                (index, item, outcome)
            });
        }

        let mut slots: Vec<Option<ItemReport>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, item, outcome)) => slots[index] = Some(ItemReport { item, outcome }),
                Err(e) => tracing::error!("Dispatch task failed: {}", e),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// Exit status for a batch: 1 if any item failed, else 2 if any was
/// quarantined, else 0
pub fn batch_exit_code(reports: &[ItemReport]) -> i32 {
    let any = |code| reports.iter().any(|r| r.outcome.exit_code() == code);
    if any(1) {
        1
    } else if any(2) {
        2
    } else {
        0
    }
}
