mod error;
mod hooks;
mod transfer;

pub use error::{ConfigError, Result};
pub use hooks::{LibraryRefreshConfig, NotifyConfig};
pub use transfer::{MoverType, TransferConfig};

use crate::classifier::{DEFAULT_TAG_BLACKLIST, TagBlacklist};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Stability polling parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StabilityConfig {
    /// Consecutive identical readings required (default: 3)
    #[serde(default = "default_checks")]
    pub checks: u32,

    /// Seconds between readings (default: 10)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl StabilityConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            checks: default_checks(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Drop folder scanned for new items; never deleted
    pub watch_dir: PathBuf,
    pub movies_dir: PathBuf,
    pub shows_dir: PathBuf,
    /// Quarantine area for items that could not be processed
    pub error_dir: PathBuf,
    pub history_file: PathBuf,

    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    /// Extensions of main media files, without the leading dot
    #[serde(default = "default_media_extensions")]
    pub media_extensions: Vec<String>,

    /// Sidecar extensions moved alongside the main file
    #[serde(default = "default_associated_extensions")]
    pub associated_extensions: Vec<String>,

    /// Case-insensitive regex of release tags stripped from names
    #[serde(default = "default_tag_blacklist")]
    pub tag_blacklist: String,

    #[serde(default)]
    pub stability: StabilityConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_history_lock_timeout_ms")]
    pub history_lock_timeout_ms: u64,

    pub library_refresh: Option<LibraryRefreshConfig>,
    pub notify: Option<NotifyConfig>,
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from("/tmp/dropflow-locks")
}

pub fn default_media_extensions() -> Vec<String> {
    [
        "mkv", "mp4", "avi", "m4v", "mov", "wmv", "ts", "m2ts", "webm", "mpg", "mpeg", "flv",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_associated_extensions() -> Vec<String> {
    ["srt", "sub", "idx", "ass", "ssa", "vtt", "smi", "nfo"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_tag_blacklist() -> String {
    DEFAULT_TAG_BLACKLIST.to_string()
}

const fn default_checks() -> u32 {
    3
}

const fn default_interval_secs() -> u64 {
    10
}

const fn default_max_concurrent() -> usize {
    2
}

const fn default_history_lock_timeout_ms() -> u64 {
    2000
}

impl IngestConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Compile the tag blacklist; validated at load so this only fails on
    /// configs built by hand
    pub fn tag_blacklist(&self) -> Result<TagBlacklist> {
        Ok(TagBlacklist::new(&self.tag_blacklist)?)
    }

    pub const fn history_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.history_lock_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        for (field, path) in [
            ("watch_dir", &self.watch_dir),
            ("movies_dir", &self.movies_dir),
            ("shows_dir", &self.shows_dir),
            ("error_dir", &self.error_dir),
            ("history_file", &self.history_file),
            ("lock_dir", &self.lock_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::MissingPath { field });
            }
        }

        match fs::metadata(&self.watch_dir) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(ConfigError::WatchDirInvalid {
                    path: self.watch_dir.clone(),
                    reason: "not a directory".to_string(),
                });
            }
            Err(e) => {
                return Err(ConfigError::WatchDirInvalid {
                    path: self.watch_dir.clone(),
                    reason: e.to_string(),
                });
            }
        }

        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.stability.checks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stability.checks",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.media_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "media_extensions",
                reason: "at least one extension is required".to_string(),
            });
        }

        self.tag_blacklist()?;

        if let Some(refresh) = &self.library_refresh
            && refresh.url.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "library_refresh.url",
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(notify) = &self.notify
            && notify.command.is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "notify.command",
                reason: "must name a program".to_string(),
            });
        }

        // Validate mover availability
        match self.transfer.mover {
            MoverType::Rsync => {
                let result = Command::new("rsync").arg("--version").output();

                match result {
                    Ok(output) if output.status.success() => {
                        tracing::debug!("Rsync is available");
                    }
                    _ => {
                        return Err(ConfigError::MoverUnavailable {
                            mover: "rsync".to_string(),
                            reason: "rsync command not found or not executable".to_string(),
                        });
                    }
                }
            }
            MoverType::Native | MoverType::DryRun => {}
        }

        Ok(())
    }
}
