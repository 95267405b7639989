use super::OutcomeObserver;
use crate::classifier::Category;
use crate::config::LibraryRefreshConfig;
use crate::error::{AppError, Result};
use reqwest::blocking::Client;
use std::mem;
use std::path::Path;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Asks a Jellyfin/Emby server to rescan its libraries after each transfer
pub struct LibraryRefresher {
    base_url: String,
    api_key: String,
    timeout: Duration,
    /// Requests still in flight; each is bounded by `timeout`
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl LibraryRefresher {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &LibraryRefreshConfig) -> Self {
        Self::new(&config.url, config.api_key.clone(), config.timeout())
    }

    pub fn refresh_url(&self) -> String {
        format!("{}/Library/Refresh", self.base_url)
    }

    /// POST the refresh request and wait for the answer
    pub fn refresh(&self) -> Result<()> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AppError::External(format!("Failed to build HTTP client: {e}")))?;

        let url = self.refresh_url();
        tracing::debug!("Requesting library refresh: {}", url);

        let response = client
            .post(&url)
            .header("X-Emby-Token", &self.api_key)
            .send()
            .map_err(|e| {
                AppError::External(format!("Failed to reach media server at {}: {e}", self.base_url))
            })?;

        if !response.status().is_success() {
            return Err(AppError::External(format!(
                "Library refresh returned error status: {}",
                response.status()
            )));
        }

        tracing::info!("Library refresh requested");
        Ok(())
    }
}

impl OutcomeObserver for LibraryRefresher {
    fn on_transfer_success(&self, category: Category, destination: &Path) {
        let refresher = Self::new(&self.base_url, self.api_key.clone(), self.timeout);
        tracing::debug!(
            "Scheduling library refresh after {} transfer of {}",
            category,
            destination.display()
        );

        let spawned = thread::Builder::new()
            .name("library-refresh".to_string())
            .spawn(move || {
                if let Err(e) = refresher.refresh() {
                    tracing::warn!("Library refresh failed: {}", e);
                }
            });
        match spawned {
            Ok(handle) => match self.pending.lock() {
                Ok(mut pending) => pending.push(handle),
                Err(poisoned) => poisoned.into_inner().push(handle),
            },
            Err(e) => tracing::warn!("Failed to start library refresh: {}", e),
        }
    }

    fn finish(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => mem::take(&mut *pending),
            Err(poisoned) => mem::take(&mut *poisoned.into_inner()),
        };
        if handles.is_empty() {
            return;
        }

        tracing::debug!("Waiting for {} library refresh request(s)", handles.len());
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("Library refresh thread panicked");
            }
        }
    }
}
