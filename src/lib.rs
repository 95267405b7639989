#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod classifier;
pub mod cli;
pub mod config;
pub mod disk;
pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod hasher;
pub mod history;
pub mod item;
pub mod lock;
pub mod mover;
pub mod notify;
pub mod pipeline;
pub mod quarantine;
pub mod stability;
pub mod transfer;

pub use classifier::{Category, ClassificationResult, Classifier, ClassifyError, TagBlacklist};
pub use cli::{Cli, Commands, default_config_path};
pub use config::{ConfigError, IngestConfig, MoverType, TransferConfig};
pub use disk::{DiskOperations, RealDisk};
pub use dispatcher::{Dispatcher, ItemReport};
pub use error::{AppError, PipelineError, Result};
pub use hasher::{Hasher, Xxh3Hasher};
pub use history::HistoryLog;
pub use item::{ItemKind, ItemType, MediaItem, discover_items};
pub use lock::ItemLockGuard;
pub use mover::{DryRunMover, LocalMover, MoveReport, Mover, NativeCopyMover, RsyncMover};
pub use notify::{CommandNotifier, LibraryRefresher, OutcomeObserver};
pub use pipeline::{ItemProcessor, Pipeline, ProcessingOutcome};
pub use quarantine::{QuarantineManager, QuarantineRecord};
pub use stability::{FsProbe, ItemProbe, Stability, StabilityMonitor};
pub use transfer::{TransferEngine, TransferPlan};
