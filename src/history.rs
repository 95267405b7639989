//! Append-only audit trail shared by every concurrently running pipeline

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

pub struct HistoryLog {
    path: PathBuf,
    lock_timeout: Duration,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            lock_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `"<YYYY-MM-DD HH:MM:SS> - <text>"` as one line.
    ///
    /// The write happens under an exclusive lock on the log file. If the lock
    /// cannot be taken within the timeout, or the filesystem does not support
    /// locking, the line is appended without it.
    pub fn append(&self, text: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = format_entry(&chrono::Local::now(), text);
        let locked = self.lock(&file);

        let written = file.write_all(line.as_bytes()).and_then(|()| file.flush());

        if locked {
            let _ = FileExt::unlock(&file);
        }

        written
    }

    fn lock(&self, file: &File) -> bool {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return true,
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        tracing::warn!(
                            "History lock on {} not acquired within {:?}, appending without it",
                            self.path.display(),
                            self.lock_timeout
                        );
                        return false;
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(
                        "Locking {} is not supported ({}), appending without it",
                        self.path.display(),
                        e
                    );
                    return false;
                }
            }
        }
    }
}

fn format_entry<Tz: chrono::TimeZone>(at: &chrono::DateTime<Tz>, text: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let single_line = text.replace(['\n', '\r'], " ");
    format!("{} - {}\n", at.format("%Y-%m-%d %H:%M:%S"), single_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_entry_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 5, 3).unwrap();
        assert_eq!(
            format_entry(&at, "TRANSFERRED: a -> b"),
            "2025-03-14 09:05:03 - TRANSFERRED: a -> b\n"
        );
        assert_eq!(format_entry(&at, "two\nlines"), "2025-03-14 09:05:03 - two lines\n");
    }

    #[test]
    fn test_append_creates_parent_and_file() {
        let temp = TempDir::new().unwrap();
        let log = HistoryLog::new(temp.path().join("logs/history.log"), Duration::from_millis(100));

        log.append("first").unwrap();
        log.append("second").unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - first"));
        assert!(lines[1].ends_with(" - second"));
    }

    #[test]
    fn test_held_lock_falls_back_after_timeout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.log");
        let holder = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        holder.lock_exclusive().unwrap();

        let log = HistoryLog::new(&path, Duration::from_millis(50));
        let started = Instant::now();
        log.append("written anyway").unwrap();

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(fs::read_to_string(&path).unwrap().contains("written anyway"));
        FileExt::unlock(&holder).unwrap();
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(HistoryLog::new(
            temp.path().join("history.log"),
            Duration::from_secs(2),
        ));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for n in 0..25 {
                        log.append(&format!("worker {worker} entry {n}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 200);
        assert!(contents.lines().all(|l| l.contains(" - worker ")));
    }
}
