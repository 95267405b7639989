//! Move failed items into the error area without ever overwriting earlier ones

use crate::history::HistoryLog;
use crate::mover::{claim_destination, release_claim, relocate};
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineRecord {
    pub original_path: PathBuf,
    pub destination_path: PathBuf,
    pub reason: String,
}

pub struct QuarantineManager {
    error_dir: PathBuf,
    history: Arc<HistoryLog>,
}

impl QuarantineManager {
    pub fn new(error_dir: impl Into<PathBuf>, history: Arc<HistoryLog>) -> Self {
        Self {
            error_dir: error_dir.into(),
            history,
        }
    }

    /// Move `path` into the error directory.
    ///
    /// Returns `Ok(None)` when the item is already gone; nothing is moved or
    /// recorded in that case. On error the item is left where it was.
    pub fn quarantine(&self, path: &Path, reason: &str) -> io::Result<Option<QuarantineRecord>> {
        let metadata = match path.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    "Nothing to quarantine, {} no longer exists",
                    path.display()
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let is_dir = metadata.is_dir();
        fs::create_dir_all(&self.error_dir)?;
        let destination = self.claim_unique_destination(path, is_dir)?;

        tracing::warn!(
            "Quarantining {} -> {} ({})",
            path.display(),
            destination.display(),
            reason
        );
        if let Err(e) = relocate(path, &destination) {
            release_claim(&destination, is_dir);
            return Err(e);
        }

        let record = QuarantineRecord {
            original_path: path.to_path_buf(),
            destination_path: destination,
            reason: reason.to_string(),
        };

        if let Err(e) = self.history.append(&format!(
            "QUARANTINED: {} -> {} (reason: {})",
            record.original_path.display(),
            record.destination_path.display(),
            record.reason
        )) {
            tracing::warn!("Failed to record quarantine in history: {}", e);
        }

        Ok(Some(record))
    }

    /// First free name in the error directory, reserved so no other quarantine
    /// can take it before the item arrives
    fn claim_unique_destination(&self, path: &Path, is_dir: bool) -> io::Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot quarantine {}: no file name", path.display()),
                )
            })?
            .to_string_lossy()
            .into_owned();

        let plain = self.error_dir.join(&name);
        if claim_destination(&plain, is_dir)? {
            return Ok(plain);
        }

        for _ in 0..MAX_NAME_ATTEMPTS {
            let candidate = self.error_dir.join(suffixed_name(&name, is_dir, &failure_tag()));
            if claim_destination(&candidate, is_dir)? {
                return Ok(candidate);
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free quarantine name for {name}"),
        ))
    }
}

/// `_failed_<YYYYmmdd_HHMMSS>_<6 hex>`
fn failure_tag() -> String {
    let random: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!(
        "_failed_{}_{random:06x}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Insert `tag` before the extension of a file, or append it to a directory name
fn suffixed_name(name: &str, is_dir: bool, tag: &str) -> String {
    if !is_dir
        && let Some((stem, ext)) = name.rsplit_once('.')
        && !stem.is_empty()
    {
        return format!("{stem}{tag}.{ext}");
    }
    format!("{name}{tag}")
}
