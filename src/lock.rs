use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, SystemTime};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    hostname: String,
    started_at: SystemTime,
    command: String,
    item: PathBuf,
}

/// Exclusive claim on one drop-folder item.
///
/// Two invocations for the same item (a watcher firing twice, `scan` racing
/// `process`) never both get past this guard. Dropping it releases the lock
/// and removes the lock file.
pub struct ItemLockGuard {
    lock_path: PathBuf,
    lock_file: File,
}

impl ItemLockGuard {
    /// Lock file name derived from the item's absolute path
    fn generate_lock_path(lock_dir: &Path, item: &Path) -> PathBuf {
        let absolute = fs::canonicalize(item).unwrap_or_else(|_| item.to_path_buf());

        let mut hasher = DefaultHasher::new();
        absolute.hash(&mut hasher);
        let hash = hasher.finish();

        lock_dir.join(format!("item-{hash:016x}.lock"))
    }

    /// Try to acquire the lock for `item` without blocking
    pub fn try_lock(lock_dir: &Path, item: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(lock_dir).map_err(|e| AppError::LockError {
            message: format!("Failed to create lock directory {}: {}", lock_dir.display(), e),
        })?;

        let lock_path = Self::generate_lock_path(lock_dir, item);

        if lock_path.exists() {
            Self::cleanup_stale_lock(&lock_path);
        }

        let mut lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .open(&lock_path)
            .map_err(|e| AppError::LockError {
                message: format!("Failed to open lock file {}: {}", lock_path.display(), e),
            })?;

        if lock_file.try_lock_exclusive().is_err() {
            let owner = Self::read_lock_info(&lock_path);
            return Err(match owner {
                Some(info) => AppError::ItemLocked {
                    item: item.to_path_buf(),
                    owner_pid: info.pid,
                    owner_host: info.hostname,
                    locked_for: SystemTime::now()
                        .duration_since(info.started_at)
                        .unwrap_or_default(),
                },
                None => AppError::ItemLocked {
                    item: item.to_path_buf(),
                    owner_pid: 0,
                    owner_host: "unknown".to_string(),
                    locked_for: Duration::from_secs(0),
                },
            });
        }

        let info = LockInfo {
            pid: process::id(),
            hostname: hostname::get().map_or_else(
                |_| "unknown".to_string(),
                |h| h.to_string_lossy().to_string(),
            ),
            started_at: SystemTime::now(),
            command: std::env::args().collect::<Vec<_>>().join(" "),
            item: item.to_path_buf(),
        };

        // Truncate only once the lock is ours, so a loser never wipes the owner's info
        lock_file.set_len(0).ok();
        lock_file
            .write_all(serde_json::to_string(&info)?.as_bytes())
            .map_err(|e| AppError::LockError {
                message: format!("Failed to write lock info: {e}"),
            })?;
        lock_file.sync_all().ok();

        tracing::debug!("Locked {} via {}", item.display(), lock_path.display());

        Ok(Self {
            lock_path,
            lock_file,
        })
    }

    /// Clean up stale locks from dead processes
    fn cleanup_stale_lock(lock_path: &Path) {
        let Ok(file) = OpenOptions::new().write(true).read(true).open(lock_path) else {
            return;
        };

        // A lock we can take is not held; remove it only if its writer is gone
        if file.try_lock_exclusive().is_ok() {
            if let Some(info) = Self::read_lock_info(lock_path)
                && !Self::is_process_alive(info.pid)
            {
                tracing::warn!(
                    "Removing stale lock from dead process {} ({}) at {}",
                    info.pid,
                    info.hostname,
                    lock_path.display()
                );
                let _ = FileExt::unlock(&file);
                drop(file);
                fs::remove_file(lock_path).ok();
                return;
            }
            let _ = FileExt::unlock(&file);
        }
    }

    fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
        let mut contents = String::new();
        File::open(lock_path)
            .ok()?
            .read_to_string(&mut contents)
            .ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn is_process_alive(pid: u32) -> bool {
        #[cfg(unix)]
        {
            // Signal 0 only checks that the process exists
            use nix::sys::signal::kill;
            use nix::unistd::Pid;

            kill(Pid::from_raw(pid as i32), None).is_ok()
        }

        #[cfg(not(unix))]
        {
            // The flock still protects us; assume the owner is alive
            let _ = pid;
            true
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ItemLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
        if let Err(e) = fs::remove_file(&self.lock_path) {
            tracing::warn!(
                "Failed to remove lock file {}: {}",
                self.lock_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let item = temp.path().join("drop/Movie.2020.mkv");
        fs::create_dir_all(item.parent().unwrap()).unwrap();
        fs::write(&item, b"x").unwrap();
        (temp, lock_dir, item)
    }

    #[test]
    fn test_lock_and_release() {
        let (_temp, lock_dir, item) = setup();

        let guard = ItemLockGuard::try_lock(&lock_dir, &item).unwrap();
        let lock_path = guard.lock_path().to_path_buf();
        assert!(lock_path.exists());
        assert!(lock_path.starts_with(&lock_dir));

        drop(guard);
        assert!(!lock_path.exists());

        // Free again after release
        assert!(ItemLockGuard::try_lock(&lock_dir, &item).is_ok());
    }

    #[test]
    fn test_lock_conflict() {
        let (_temp, lock_dir, item) = setup();

        let _guard = ItemLockGuard::try_lock(&lock_dir, &item).unwrap();
        match ItemLockGuard::try_lock(&lock_dir, &item) {
            Err(AppError::ItemLocked { owner_pid, .. }) => {
                assert_eq!(owner_pid, process::id());
            }
            Err(e) => panic!("Expected ItemLocked, got {e}"),
            Ok(_) => panic!("Expected ItemLocked, got a second guard"),
        }
    }

    #[test]
    fn test_different_items_different_locks() {
        let (temp, lock_dir, item) = setup();
        let other = temp.path().join("drop/Other.Show.S01E01.mkv");
        fs::write(&other, b"y").unwrap();

        let g1 = ItemLockGuard::try_lock(&lock_dir, &item).unwrap();
        let g2 = ItemLockGuard::try_lock(&lock_dir, &other).unwrap();
        assert_ne!(g1.lock_path(), g2.lock_path());
    }

    #[test]
    fn test_stale_lock_cleanup() {
        let (_temp, lock_dir, item) = setup();
        fs::create_dir_all(&lock_dir).unwrap();

        let lock_path = ItemLockGuard::generate_lock_path(&lock_dir, &item);
        let stale_info = LockInfo {
            pid: 999_999_999,
            hostname: "test-host".to_string(),
            started_at: SystemTime::now(),
            command: "test".to_string(),
            item: item.clone(),
        };
        fs::write(&lock_path, serde_json::to_string(&stale_info).unwrap()).unwrap();

        let guard = ItemLockGuard::try_lock(&lock_dir, &item).unwrap();
        let info = ItemLockGuard::read_lock_info(guard.lock_path()).unwrap();
        assert_eq!(info.pid, process::id());
    }
}
