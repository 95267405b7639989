//! Content checksums used to verify copies before the source is removed

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

/// Trait for calculating file checksums
pub trait Hasher: Send + Sync {
    fn calculate_hash(&self, path: &Path) -> io::Result<String>;

    /// Check if two files have identical content
    fn files_are_identical(&self, path1: &Path, path2: &Path) -> io::Result<bool> {
        if fs::metadata(path1)?.len() != fs::metadata(path2)?.len() {
            return Ok(false);
        }
        Ok(self.calculate_hash(path1)? == self.calculate_hash(path2)?)
    }
}

/// Streaming XXH3-128 hasher
pub struct Xxh3Hasher;

impl Xxh3Hasher {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for Xxh3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Xxh3Hasher {
    fn calculate_hash(&self, path: &Path) -> io::Result<String> {
        calculate_checksum(path)
    }
}

/// XXH3-128 of a file's content as 32 lowercase hex digits.
///
/// Reads in 1MB chunks and, on Linux, tells the kernel the read is sequential
/// and drops the pages afterwards so verifying a large episode does not evict
/// the rest of the page cache.
pub fn calculate_checksum(path: &Path) -> io::Result<String> {
    const BUFFER_SIZE: usize = 1024 * 1024;

    let file = File::open(path)?;
    let file_size = file.metadata()?.len();

    #[cfg(target_os = "linux")]
    use std::os::unix::io::AsRawFd;

    #[cfg(target_os = "linux")]
    let fd = file.as_raw_fd();

    #[cfg(target_os = "linux")]
    unsafe {
        libc::posix_fadvise(fd, 0, 0, libc::POSIX_FADV_SEQUENTIAL);
    }

    tracing::debug!(
        "Hashing {} ({:.2} MB)",
        path.display(),
        file_size as f64 / (1024.0 * 1024.0)
    );

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    #[cfg(target_os = "linux")]
    unsafe {
        libc::posix_fadvise(fd, 0, 0, libc::POSIX_FADV_DONTNEED);
    }

    let hash = hasher.digest128();
    tracing::debug!("Hash complete: {} = {:032x}", path.display(), hash);

    Ok(format!("{hash:032x}"))
}
