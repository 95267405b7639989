//! Disk operations abstraction for testing and flexibility

use std::path::{Path, PathBuf};

/// Trait for disk space queries
///
/// Allows different implementations for production (real disk) and testing (mock)
pub trait DiskOperations: Send + Sync {
    /// Space available to unprivileged writers, in bytes
    fn get_free_space(&self, path: &Path) -> u64;
}

/// Real disk operations using fs2 statvfs
pub struct RealDisk;

impl RealDisk {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RealDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskOperations for RealDisk {
    fn get_free_space(&self, path: &Path) -> u64 {
        use fs2::statvfs;

        statvfs(path).map_or_else(
            |e| {
                tracing::warn!("Failed to get free space for {}: {}", path.display(), e);
                0
            },
            |stat| stat.available_space(),
        )
    }
}

/// Closest ancestor of `path` (or `path` itself) that exists.
///
/// Lets the free-space query run before any destination directory is created.
pub fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|candidate| !candidate.as_os_str().is_empty() && candidate.exists())
        .map(Path::to_path_buf)
}

/// Whole kilobytes needed to hold `bytes`, never less than one
pub const fn required_kb(bytes: u64) -> u64 {
    let kb = bytes.div_ceil(1024);
    if kb == 0 { 1 } else { kb }
}

/// Mock disk operations for testing
#[cfg(test)]
pub struct MockDisk {
    free: u64,
}

#[cfg(test)]
impl MockDisk {
    pub const fn new(free: u64) -> Self {
        Self { free }
    }
}

#[cfg(test)]
impl DiskOperations for MockDisk {
    fn get_free_space(&self, _path: &Path) -> u64 {
        self.free
    }
}
