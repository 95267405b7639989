use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Item {item:?} is locked by process {owner_pid} on {owner_host} for {locked_for:?}")]
    ItemLocked {
        item: PathBuf,
        owner_pid: u32,
        owner_host: String,
        locked_for: Duration,
    },

    #[error("Failed to acquire lock: {message}")]
    LockError { message: String },

    #[error("Command failed: {command}. Exit code: {exit_code}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("External service error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Per-item failures. Every variant is routed to quarantine by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("classification failed: {0}")]
    Classification(#[from] crate::classifier::ClassifyError),

    #[error("stability timeout: item still changing after {checks} checks")]
    StabilityTimeout { checks: u32 },

    #[error("item vanished while waiting for it to settle")]
    Vanished,

    #[error("no media files found in {0:?}")]
    NoMediaFiles(PathBuf),

    #[error("unsupported media extension: {0:?}")]
    UnsupportedExtension(PathBuf),

    #[error(
        "insufficient disk space at {path:?}: need {required_kb} KB, {available_kb} KB available"
    )]
    InsufficientSpace {
        path: PathBuf,
        required_kb: u64,
        available_kb: u64,
    },

    #[error("destination not writable: {path:?}: {reason}")]
    DestinationNotWritable { path: PathBuf, reason: String },

    #[error("transfer failed: {0}")]
    Transfer(#[source] io::Error),
}
