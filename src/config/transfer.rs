use serde::Deserialize;
use std::time::Duration;

/// Copy mechanism used when a plain rename cannot cross filesystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoverType {
    Rsync,
    Native,
    DryRun,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    #[serde(default = "default_mover")]
    pub mover: MoverType,

    /// Upper bound for a single cross-filesystem copy (default: 3600)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Additional rsync arguments (e.g. bandwidth limiting)
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl TransferConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mover: default_mover(),
            timeout_secs: default_timeout_secs(),
            extra_args: Vec::new(),
        }
    }
}

const fn default_mover() -> MoverType {
    MoverType::Rsync
}

const fn default_timeout_secs() -> u64 {
    3600
}
