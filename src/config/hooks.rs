use serde::Deserialize;
use std::time::Duration;

/// Media server whose library is rescanned after a successful transfer
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryRefreshConfig {
    /// Base URL of the server (e.g., "<http://localhost:8096>")
    pub url: String,

    /// API key sent as `X-Emby-Token`
    pub api_key: String,

    /// Request timeout (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LibraryRefreshConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const fn default_timeout_secs() -> u64 {
    10
}

/// External command run once per terminal outcome
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Program followed by its arguments
    pub command: Vec<String>,
}
