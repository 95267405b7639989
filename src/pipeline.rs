//! Per-item processing: stability, classification, transfer, quarantine.

use crate::classifier::{Category, Classifier};
use crate::config::{IngestConfig, Result as ConfigResult};
use crate::disk::{DiskOperations, RealDisk};
use crate::error::PipelineError;
use crate::factory::{build_classifier, build_mover, build_observers};
use crate::history::HistoryLog;
use crate::item::MediaItem;
use crate::lock::ItemLockGuard;
use crate::mover::Mover;
use crate::notify::OutcomeObserver;
use crate::quarantine::QuarantineManager;
use crate::stability::{Stability, StabilityMonitor};
use crate::transfer::TransferEngine;
use std::path::PathBuf;
use std::sync::Arc;

/// Terminal result of processing one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Success {
        destination: PathBuf,
        category: Category,
    },
    /// The item was moved to the error area, or had already vanished
    Quarantined {
        reason: String,
        destination: Option<PathBuf>,
    },
    /// Nothing could be done and the item stays where it was
    Failed { reason: String },
}

impl ProcessingOutcome {
    /// Process exit status for single-item runs
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Success { .. } => 0,
            Self::Failed { .. } => 1,
            Self::Quarantined { .. } => 2,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Quarantined { .. } => "quarantined",
            Self::Failed { .. } => "failed",
        }
    }

    /// Destination for successes, reason otherwise
    pub fn detail(&self) -> String {
        match self {
            Self::Success { destination, .. } => destination.display().to_string(),
            Self::Quarantined { reason, .. } | Self::Failed { reason } => reason.clone(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Anything that can take an item to a terminal outcome
pub trait ItemProcessor: Send + Sync {
    fn process(&self, item: &MediaItem) -> ProcessingOutcome;
}

pub struct Pipeline {
    monitor: StabilityMonitor,
    classifier: Classifier,
    transfer: TransferEngine,
    quarantine: QuarantineManager,
    history: Arc<HistoryLog>,
    movies_dir: PathBuf,
    shows_dir: PathBuf,
    lock_dir: PathBuf,
    observers: Vec<Box<dyn OutcomeObserver>>,
}

impl Pipeline {
    /// Pipeline over the configured directories with explicit collaborators
    pub fn new(
        config: &IngestConfig,
        monitor: StabilityMonitor,
        mover: Box<dyn Mover>,
        disk: Box<dyn DiskOperations>,
    ) -> ConfigResult<Self> {
        let history = Arc::new(HistoryLog::new(
            &config.history_file,
            config.history_lock_timeout(),
        ));

        Ok(Self {
            monitor,
            classifier: build_classifier(config)?,
            transfer: TransferEngine::new(
                &config.watch_dir,
                &config.media_extensions,
                &config.associated_extensions,
                mover,
                disk,
            )
            .with_history(Arc::clone(&history)),
            quarantine: QuarantineManager::new(&config.error_dir, Arc::clone(&history)),
            history,
            movies_dir: config.movies_dir.clone(),
            shows_dir: config.shows_dir.clone(),
            lock_dir: config.lock_dir.clone(),
            observers: Vec::new(),
        })
    }

    /// Production wiring: filesystem probe, configured mover, real disk, hooks
    pub fn from_config(config: &IngestConfig) -> ConfigResult<Self> {
        let monitor = StabilityMonitor::new(config.stability.checks, config.stability.interval());
        let mut pipeline = Self::new(
            config,
            monitor,
            build_mover(&config.transfer),
            Box::new(RealDisk::new()),
        )?;
        pipeline.observers = build_observers(config);
        Ok(pipeline)
    }

    pub fn with_observer(mut self, observer: Box<dyn OutcomeObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Wait for observer work started by earlier items. Call before exiting.
    pub fn finish(&self) {
        for observer in &self.observers {
            observer.finish();
        }
    }

    fn run(&self, item: &MediaItem) -> Result<(PathBuf, Category), PipelineError> {
        match self.monitor.check(&item.path) {
            Stability::Stable => {}
            Stability::Unstable => {
                return Err(PipelineError::StabilityTimeout {
                    checks: self.monitor.max_checks(),
                });
            }
            Stability::Vanished => return Err(PipelineError::Vanished),
        }

        let classification = self.classifier.classify(&item.name(), item.category_hint)?;
        let template = classification.destination_template(&self.movies_dir, &self.shows_dir);
        let destination = self
            .transfer
            .transfer(&item.path, &template, classification.category)?;
        self.transfer.cleanup_source(&item.path);

        Ok((destination, classification.category))
    }

    fn quarantine_item(&self, item: &MediaItem, error: &PipelineError) -> ProcessingOutcome {
        let reason = error.to_string();
        tracing::warn!("Processing {} failed: {}", item, reason);

        if self.transfer.is_dry_run() {
            tracing::info!("[DRY-RUN] Would quarantine {}", item);
            return ProcessingOutcome::Quarantined {
                reason,
                destination: None,
            };
        }

        match self.quarantine.quarantine(&item.path, &reason) {
            Ok(record) => ProcessingOutcome::Quarantined {
                reason,
                destination: record.map(|r| r.destination_path),
            },
            Err(e) => {
                tracing::error!("Failed to quarantine {}: {}", item, e);
                ProcessingOutcome::Failed {
                    reason: format!("quarantine failed: {e} (after: {reason})"),
                }
            }
        }
    }

    fn notify(&self, item: &MediaItem, outcome: &ProcessingOutcome) {
        for observer in &self.observers {
            observer.on_outcome(item, outcome);
        }
    }
}

impl ItemProcessor for Pipeline {
    fn process(&self, item: &MediaItem) -> ProcessingOutcome {
        tracing::info!("Processing {}", item);

        let _lock = match ItemLockGuard::try_lock(&self.lock_dir, &item.path) {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", item, e);
                let outcome = ProcessingOutcome::Failed {
                    reason: e.to_string(),
                };
                self.notify(item, &outcome);
                return outcome;
            }
        };

        let outcome = match self.run(item) {
            Ok((destination, category)) if self.transfer.is_dry_run() => {
                tracing::info!("[DRY-RUN] Would file {} as {}", item, destination.display());
                return ProcessingOutcome::Success {
                    destination,
                    category,
                };
            }
            Ok((destination, category)) => {
                if let Err(e) = self.history.append(&format!(
                    "TRANSFERRED: {} -> {} ({})",
                    item.path.display(),
                    destination.display(),
                    category
                )) {
                    tracing::warn!("Failed to record transfer in history: {}", e);
                }
                tracing::info!("Transferred {} -> {}", item, destination.display());

                for observer in &self.observers {
                    observer.on_transfer_success(category, &destination);
                }
                ProcessingOutcome::Success {
                    destination,
                    category,
                }
            }
            Err(e) => self.quarantine_item(item, &e),
        };

        if !self.transfer.is_dry_run() {
            self.notify(item, &outcome);
        }
        outcome
    }
}
