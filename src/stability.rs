//! Wait for an item to stop changing before it is processed

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

/// Size and modification time of an item at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Poll bookkeeping, discarded once the check concludes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityState {
    pub last: Signature,
    pub consecutive_stable: u32,
}

impl StabilityState {
    const fn new(first: Signature) -> Self {
        Self {
            last: first,
            consecutive_stable: 0,
        }
    }

    /// Record a poll; any change resets the counter
    fn observe(&mut self, current: Signature) {
        if current == self.last {
            self.consecutive_stable += 1;
        } else {
            self.consecutive_stable = 0;
            self.last = current;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Stable,
    Unstable,
    Vanished,
}

/// Reads an item's current signature
pub trait ItemProbe: Send + Sync {
    /// `Ok(None)` when the item no longer exists
    fn probe(&self, path: &Path) -> io::Result<Option<Signature>>;
}

/// Filesystem probe: total size of every file under a directory (or the file's
/// size) paired with the item's own modification time
pub struct FsProbe;

impl ItemProbe for FsProbe {
    fn probe(&self, path: &Path) -> io::Result<Option<Signature>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let size_bytes = if metadata.is_dir() {
            WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        tracing::debug!("Skipping unreadable entry under {}: {}", path.display(), err);
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        } else {
            metadata.len()
        };

        Ok(Some(Signature {
            size_bytes,
            modified: metadata.modified()?,
        }))
    }
}

pub struct StabilityMonitor {
    probe: Box<dyn ItemProbe>,
    max_checks: u32,
    interval: Duration,
}

impl StabilityMonitor {
    pub fn new(max_checks: u32, interval: Duration) -> Self {
        Self::with_probe(Box::new(FsProbe), max_checks, interval)
    }

    pub fn with_probe(probe: Box<dyn ItemProbe>, max_checks: u32, interval: Duration) -> Self {
        Self {
            probe,
            max_checks,
            interval,
        }
    }

    /// Take a baseline reading, then `max_checks` more readings `interval` apart.
    ///
    /// Stable only if every one of those readings matched the one before it.
    /// A probe error counts as a change, so it can only delay stability.
    pub fn check(&self, path: &Path) -> Stability {
        let Some(first) = self.read(path) else {
            return Stability::Vanished;
        };
        let mut state = StabilityState::new(first);

        for poll in 1..=self.max_checks {
            std::thread::sleep(self.interval);

            let Some(current) = self.read(path) else {
                tracing::warn!("Item vanished during stability check: {}", path.display());
                return Stability::Vanished;
            };
            state.observe(current);

            tracing::debug!(
                "Stability poll {}/{} for {}: {} bytes, stable count {}",
                poll,
                self.max_checks,
                path.display(),
                current.size_bytes,
                state.consecutive_stable
            );
        }

        if state.consecutive_stable >= self.max_checks {
            tracing::info!("Item is stable: {}", path.display());
            Stability::Stable
        } else {
            tracing::warn!(
                "Item did not stabilize after {} checks: {}",
                self.max_checks,
                path.display()
            );
            Stability::Unstable
        }
    }

    pub const fn max_checks(&self) -> u32 {
        self.max_checks
    }

    fn read(&self, path: &Path) -> Option<Signature> {
        match self.probe.probe(path) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!("Failed to read {} during stability check: {}", path.display(), e);
                Some(Signature {
                    size_bytes: u64::MAX,
                    modified: SystemTime::now(),
                })
            }
        }
    }
}

/// Scripted probe returning a fixed sequence of readings
#[cfg(test)]
pub struct ScriptedProbe {
    readings: std::sync::Mutex<std::collections::VecDeque<Option<Signature>>>,
}

#[cfg(test)]
impl ScriptedProbe {
    pub fn new(readings: Vec<Option<Signature>>) -> Self {
        Self {
            readings: std::sync::Mutex::new(readings.into()),
        }
    }

    pub fn sizes(sizes: &[u64]) -> Self {
        let modified = SystemTime::UNIX_EPOCH;
        Self::new(
            sizes
                .iter()
                .map(|&size_bytes| {
                    Some(Signature {
                        size_bytes,
                        modified,
                    })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
impl ItemProbe for ScriptedProbe {
    fn probe(&self, _path: &Path) -> io::Result<Option<Signature>> {
        let mut readings = self.readings.lock().unwrap();
        Ok(readings.pop_front().unwrap_or(None))
    }
}
