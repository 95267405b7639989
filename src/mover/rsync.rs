use super::{
    MoveReport, Mover, PartialFile, Prepared, ensure_source_exists, finalize_copy,
    prepare_destination,
};
use crate::hasher::Hasher;
use std::fs;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Rsync-based mover for cross-filesystem moves
///
/// rsync writes into `<dest>.partial`; the copy is checksummed with the
/// configured hasher before it is renamed into place and the source removed.
pub struct RsyncMover {
    /// Additional rsync arguments (e.g., bandwidth limiting)
    extra_args: Vec<String>,
    /// Wall-clock limit for one rsync run
    timeout: Duration,
    hasher: Box<dyn Hasher>,
}

impl RsyncMover {
    pub fn new(extra_args: Vec<String>, timeout: Duration, hasher: Box<dyn Hasher>) -> Self {
        Self {
            extra_args,
            timeout,
            hasher,
        }
    }

    fn build_command(&self, source: &Path, target: &Path) -> Command {
        let mut cmd = Command::new("rsync");
        cmd.arg("--perms")
            .arg("--times")
            .arg(format!("--timeout={}", self.timeout.as_secs().max(1)));

        for arg in &self.extra_args {
            cmd.arg(arg);
        }

        cmd.arg(source.as_os_str())
            .arg(target.as_os_str())
            .stdin(Stdio::null());
        cmd
    }

    /// Run rsync, killing it if it outlives the timeout
    fn run(&self, source: &Path, target: &Path) -> io::Result<()> {
        let mut child = self.build_command(source, target).spawn()?;
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(status) = child.try_wait()? {
                if status.success() {
                    return Ok(());
                }
                tracing::error!(
                    "Rsync failed for {} -> {}",
                    source.display(),
                    target.display()
                );
                return Err(io::Error::other(format!(
                    "rsync failed with exit code {:?}",
                    status.code()
                )));
            }

            if Instant::now() >= deadline {
                tracing::error!(
                    "Rsync exceeded {}s for {}, killing it",
                    self.timeout.as_secs(),
                    source.display()
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("rsync timed out after {}s", self.timeout.as_secs()),
                ));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Mover for RsyncMover {
    fn move_file(&self, source: &Path, destination: &Path) -> io::Result<MoveReport> {
        ensure_source_exists(source)?;

        let backup = match prepare_destination(source, destination, self.hasher.as_ref())? {
            Prepared::AlreadyPresent => return Ok(MoveReport::DuplicateRemoved),
            Prepared::Proceed { backup } => backup,
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let before = fs::metadata(source)?;
        let partial = PartialFile::for_destination(destination);

        tracing::info!(
            "Copying file: {} -> {}",
            source.display(),
            destination.display()
        );

        self.run(source, partial.path())?;

        finalize_copy(source, &before, partial, destination, self.hasher.as_ref())?;
        Ok(MoveReport::Moved { backup })
    }
}
