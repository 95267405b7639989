use crate::hasher::Hasher;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

mod native;
mod rsync;

pub use native::NativeCopyMover;
pub use rsync::RsyncMover;

/// Trait for moving one file into the library
/// Different implementations can use rename, rsync, an in-process copy, etc.
pub trait Mover: Send + Sync {
    /// Move file from source to destination
    ///
    /// # Arguments
    /// * `source` - Full path to source file
    /// * `destination` - Full path to destination file
    ///
    /// On success the source no longer exists and the destination holds its
    /// content. On failure the source is left in place.
    fn move_file(&self, source: &Path, destination: &Path) -> io::Result<MoveReport>;

    /// True when moves are only logged and the filesystem must stay untouched
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// What a successful [`Mover::move_file`] did besides the move itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveReport {
    /// Source now lives at the destination. A different file that was there
    /// before was renamed to `backup`.
    Moved { backup: Option<PathBuf> },
    /// Identical content was already at the destination; the source was deleted
    DuplicateRemoved,
    /// Nothing was touched
    DryRun,
}

/// `DryRun` implementation - only logs operations without actual movement
pub struct DryRunMover;

impl Mover for DryRunMover {
    fn move_file(&self, source: &Path, destination: &Path) -> io::Result<MoveReport> {
        tracing::info!(
            "[DRY-RUN] Would move: {} -> {}",
            source.display(),
            destination.display()
        );
        Ok(MoveReport::DryRun)
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

/// Same-filesystem rename, handing off to a copying mover when the
/// destination lives on another device
pub struct LocalMover {
    fallback: Box<dyn Mover>,
    hasher: Box<dyn Hasher>,
}

impl LocalMover {
    pub fn new(fallback: Box<dyn Mover>, hasher: Box<dyn Hasher>) -> Self {
        Self { fallback, hasher }
    }
}

impl Mover for LocalMover {
    fn move_file(&self, source: &Path, destination: &Path) -> io::Result<MoveReport> {
        ensure_source_exists(source)?;

        let backup = match prepare_destination(source, destination, self.hasher.as_ref())? {
            Prepared::AlreadyPresent => return Ok(MoveReport::DuplicateRemoved),
            Prepared::Proceed { backup } => backup,
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::rename(source, destination) {
            Ok(()) => {
                tracing::info!(
                    "Renamed: {} -> {}",
                    source.display(),
                    destination.display()
                );
                Ok(MoveReport::Moved { backup })
            }
            Err(e) if is_cross_device(&e) => {
                tracing::debug!(
                    "{} and {} are on different filesystems, copying",
                    source.display(),
                    destination.display()
                );
                // The destination is free now, so the copier reports no backup of its own
                self.fallback
                    .move_file(source, destination)
                    .map(|report| match report {
                        MoveReport::Moved { backup: None } => MoveReport::Moved { backup },
                        other => other,
                    })
            }
            Err(e) => Err(e),
        }
    }
}

pub fn is_cross_device(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(libc::EXDEV)
}

/// Copy target that never appears under the final name until verified.
///
/// Dropping an uncommitted guard removes whatever was written, so every early
/// return and unwinding path cleans up the half-copied file.
pub struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    /// `<destination>.partial` next to the final file
    pub fn for_destination(destination: &Path) -> Self {
        Self {
            path: with_suffix(destination, ".partial"),
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename into place
    pub fn commit(mut self, destination: &Path) -> io::Result<()> {
        tracing::debug!(
            "Atomically renaming {} -> {}",
            self.path.display(),
            destination.display()
        );
        fs::rename(&self.path, destination)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed partial copy {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove partial copy {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Destination is free; go ahead with the move. A differing file that
    /// was there has been renamed to `backup`.
    Proceed { backup: Option<PathBuf> },
    /// Identical content already at the destination; source was removed
    AlreadyPresent,
}

/// Deal with a file already sitting at `destination`.
///
/// Identical content means the move is already done and the source is dropped.
/// Different content is kept as `<destination>.backup-<unix ts>`.
pub fn prepare_destination(
    source: &Path,
    destination: &Path,
    hasher: &dyn Hasher,
) -> io::Result<Prepared> {
    if !destination.exists() {
        return Ok(Prepared::Proceed { backup: None });
    }

    if hasher.files_are_identical(source, destination)? {
        tracing::info!(
            "Destination already exists and is identical: {}",
            destination.display()
        );
        fs::remove_file(source)?;
        return Ok(Prepared::AlreadyPresent);
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let backup_path = with_suffix(destination, &format!(".backup-{timestamp}"));

    tracing::warn!(
        "Destination already exists but differs: {} -> Backing up to: {}",
        destination.display(),
        backup_path.display()
    );

    fs::rename(destination, &backup_path)?;
    Ok(Prepared::Proceed {
        backup: Some(backup_path),
    })
}

/// Verify a finished copy, move it into place and only then drop the source.
///
/// `before` is the source metadata captured before copying started.
pub fn finalize_copy(
    source: &Path,
    before: &Metadata,
    partial: PartialFile,
    destination: &Path,
    hasher: &dyn Hasher,
) -> io::Result<()> {
    let copied = fs::metadata(partial.path()).map_err(|e| {
        io::Error::other(format!(
            "Temporary destination file was not created: {}: {e}",
            partial.path().display()
        ))
    })?;

    if copied.len() != before.len() {
        return Err(io::Error::other(format!(
            "File size mismatch after copy: source={} bytes, dest={} bytes",
            before.len(),
            copied.len()
        )));
    }

    let source_checksum = hasher.calculate_hash(source)?;
    let dest_checksum = hasher.calculate_hash(partial.path())?;
    if source_checksum != dest_checksum {
        return Err(io::Error::other(format!(
            "Checksum mismatch after copy: source={source_checksum}, dest={dest_checksum}"
        )));
    }

    let after = fs::metadata(source)?;
    if after.len() != before.len() || after.modified()? != before.modified()? {
        tracing::warn!(
            "Source file changed during copy: {} ({} -> {} bytes)",
            source.display(),
            before.len(),
            after.len()
        );
        return Err(io::Error::other(format!(
            "Source file was modified during copy: {}",
            source.display()
        )));
    }

    partial.commit(destination)?;
    fs::remove_file(source)?;

    tracing::info!(
        "Successfully moved: {} -> {} (checksum: {})",
        source.display(),
        destination.display(),
        source_checksum
    );
    Ok(())
}

/// Atomically reserve `destination` with an empty placeholder of the same
/// kind as the item about to replace it.
///
/// Returns `Ok(false)` when something already exists there. Concurrent callers
/// racing for one name get exactly one `true`.
pub fn claim_destination(destination: &Path, is_dir: bool) -> io::Result<bool> {
    let claimed = if is_dir {
        fs::create_dir(destination)
    } else {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .map(|_| ())
    };

    match claimed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// Undo [`claim_destination`] when the move into it did not happen
pub fn release_claim(destination: &Path, is_dir: bool) {
    let released = if is_dir {
        fs::remove_dir(destination)
    } else {
        fs::remove_file(destination)
    };
    if let Err(e) = released
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(
            "Failed to release claimed name {}: {}",
            destination.display(),
            e
        );
    }
}

/// Move a whole file or directory tree onto a destination claimed with
/// [`claim_destination`].
///
/// Used for quarantine, where the item is kept as-is. The rename replaces the
/// empty placeholder. A cross-device move copies the tree first and removes the
/// source only once the copy finished; a failed copy is removed and the source
/// left untouched.
pub fn relocate(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => return Ok(()),
        Err(e) if is_cross_device(&e) => {}
        Err(e) => return Err(e),
    }

    let copied = if fs::metadata(source)?.is_dir() {
        copy_tree(source, destination)
    } else {
        fs::copy(source, destination).map(|_| ())
    };

    if let Err(e) = copied {
        let cleanup = if destination.is_dir() {
            fs::remove_dir_all(destination)
        } else {
            fs::remove_file(destination)
        };
        if let Err(cleanup_err) = cleanup
            && cleanup_err.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(
                "Failed to remove incomplete copy {}: {}",
                destination.display(),
                cleanup_err
            );
        }
        return Err(e);
    }

    if source.is_dir() {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    }
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn ensure_source_exists(source: &Path) -> io::Result<()> {
    if source.exists() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Source file does not exist: {}", source.display()),
        ))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
