//! Locate the main media file of an item and move it, with its sidecars, into
//! the library

use crate::classifier::Category;
use crate::disk::{DiskOperations, nearest_existing_ancestor, required_kb};
use crate::error::PipelineError;
use crate::history::HistoryLog;
use crate::mover::{MoveReport, Mover};
use lazy_regex::{Regex, regex};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Everything needed to move one item, built once and consumed by [`TransferEngine::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub main_source: PathBuf,
    pub main_size_bytes: u64,
    /// Library path of the main file without extension
    pub destination_template: PathBuf,
    pub associated_sources: Vec<PathBuf>,
}

pub struct TransferEngine {
    watch_root: PathBuf,
    media_extensions: Vec<String>,
    associated_extensions: Vec<String>,
    mover: Box<dyn Mover>,
    disk: Box<dyn DiskOperations>,
    history: Option<Arc<HistoryLog>>,
}

impl TransferEngine {
    pub fn new(
        watch_root: impl Into<PathBuf>,
        media_extensions: &[String],
        associated_extensions: &[String],
        mover: Box<dyn Mover>,
        disk: Box<dyn DiskOperations>,
    ) -> Self {
        Self {
            watch_root: watch_root.into(),
            media_extensions: normalize_extensions(media_extensions),
            associated_extensions: normalize_extensions(associated_extensions),
            mover,
            disk,
            history: None,
        }
    }

    /// Record deletions, backups and directory removals in `history`
    pub fn with_history(mut self, history: Arc<HistoryLog>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.mover.is_dry_run()
    }

    /// Plan and execute the move of `source` into `<destination_template>.<ext>`
    pub fn transfer(
        &self,
        source: &Path,
        destination_template: &Path,
        category: Category,
    ) -> Result<PathBuf, PipelineError> {
        let plan = self.plan(source, destination_template)?;
        tracing::info!(
            "Transferring {} ({}, {} bytes, {} associated files)",
            plan.main_source.display(),
            category,
            plan.main_size_bytes,
            plan.associated_sources.len()
        );
        self.execute(plan)
    }

    pub fn plan(
        &self,
        source: &Path,
        destination_template: &Path,
    ) -> Result<TransferPlan, PipelineError> {
        let metadata = fs::metadata(source).map_err(PipelineError::Transfer)?;

        let (main_source, main_size_bytes) = if metadata.is_dir() {
            self.find_main_file(source)?
        } else if self.is_media(source) {
            (source.to_path_buf(), metadata.len())
        } else {
            return Err(PipelineError::UnsupportedExtension(source.to_path_buf()));
        };

        let associated_sources = self
            .find_associated(&main_source, !metadata.is_dir())
            .map_err(PipelineError::Transfer)?;

        Ok(TransferPlan {
            main_source,
            main_size_bytes,
            destination_template: destination_template.to_path_buf(),
            associated_sources,
        })
    }

    /// Move the main file, then its sidecars. Returns the main file's new path.
    pub fn execute(&self, plan: TransferPlan) -> Result<PathBuf, PipelineError> {
        let destination = match plan.main_source.extension() {
            Some(ext) => with_extension_appended(&plan.destination_template, ext),
            None => plan.destination_template.clone(),
        };
        let parent = destination
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        self.check_space(&parent, plan.main_size_bytes)?;

        if !self.is_dry_run() {
            fs::create_dir_all(&parent).map_err(|e| PipelineError::DestinationNotWritable {
                path: parent.clone(),
                reason: e.to_string(),
            })?;
            ensure_writable(&parent)?;
        }

        let report = self
            .mover
            .move_file(&plan.main_source, &destination)
            .map_err(PipelineError::Transfer)?;
        self.record_move(&plan.main_source, &destination, &report);

        let new_stem = destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let old_stem = plan
            .main_source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for sidecar in &plan.associated_sources {
            self.move_associated(sidecar, &old_stem, &new_stem, &parent);
        }

        tracing::info!(
            "Transferred {} -> {}",
            plan.main_source.display(),
            destination.display()
        );
        Ok(destination)
    }

    /// Remove directories the transfer left empty under `item`, then `item`
    /// itself if empty. The watched root is never removed.
    pub fn cleanup_source(&self, item: &Path) {
        if self.is_dry_run() {
            return;
        }

        match fs::symlink_metadata(item) {
            Ok(metadata) if metadata.is_dir() => {}
            _ => return,
        }

        if self.is_protected(item) {
            tracing::warn!(
                "Refusing to clean up {}: it is or contains the watched root",
                item.display()
            );
            return;
        }

        for entry in WalkDir::new(item)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_dir() && fs::remove_dir(entry.path()).is_ok() {
                tracing::debug!("Removed empty directory: {}", entry.path().display());
                self.record(&format!(
                    "REMOVED: {} (empty after transfer)",
                    entry.path().display()
                ));
            }
        }

        match fs::remove_dir(item) {
            Ok(()) => {
                tracing::info!("Removed emptied source directory {}", item.display());
                self.record(&format!("REMOVED: {} (empty after transfer)", item.display()));
            }
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
                tracing::debug!("Leaving {}: still has files", item.display());
            }
            Err(e) => tracing::debug!("Could not remove {}: {}", item.display(), e),
        }
    }

    fn record_move(&self, source: &Path, destination: &Path, report: &MoveReport) {
        match report {
            MoveReport::DuplicateRemoved => self.record(&format!(
                "DELETED: {} (identical copy already at {})",
                source.display(),
                destination.display()
            )),
            MoveReport::Moved {
                backup: Some(backup),
            } => self.record(&format!(
                "BACKED UP: {} -> {}",
                destination.display(),
                backup.display()
            )),
            MoveReport::Moved { backup: None } | MoveReport::DryRun => {}
        }
    }

    fn record(&self, entry: &str) {
        if let Some(history) = &self.history
            && let Err(e) = history.append(entry)
        {
            tracing::warn!("Failed to record in history: {}", e);
        }
    }

    fn is_protected(&self, item: &Path) -> bool {
        let (Ok(root), Ok(item)) = (fs::canonicalize(&self.watch_root), fs::canonicalize(item))
        else {
            return true;
        };
        root.starts_with(&item)
    }

    fn check_space(&self, parent: &Path, size_bytes: u64) -> Result<(), PipelineError> {
        let probe = nearest_existing_ancestor(parent).ok_or_else(|| {
            PipelineError::DestinationNotWritable {
                path: parent.to_path_buf(),
                reason: "no existing ancestor directory".to_string(),
            }
        })?;

        let required_kb = required_kb(size_bytes);
        let available_kb = self.disk.get_free_space(&probe) / 1024;

        tracing::debug!(
            "Disk space at {}: need {} KB, {} KB available",
            probe.display(),
            required_kb,
            available_kb
        );

        if available_kb < required_kb {
            return Err(PipelineError::InsufficientSpace {
                path: probe,
                required_kb,
                available_kb,
            });
        }
        Ok(())
    }

    /// Largest media file directly inside `dir`, or one level deeper when
    /// `dir` holds none itself
    fn find_main_file(&self, dir: &Path) -> Result<(PathBuf, u64), PipelineError> {
        let mut candidates = self.media_files_in(dir).map_err(PipelineError::Transfer)?;

        if candidates.is_empty() {
            for subdir in sorted_entries(dir).map_err(PipelineError::Transfer)? {
                if subdir.is_dir() {
                    candidates.extend(
                        self.media_files_in(&subdir)
                            .map_err(PipelineError::Transfer)?,
                    );
                }
            }
        }

        // Ties keep the first candidate seen
        let mut best: Option<(PathBuf, u64)> = None;
        for (path, size) in candidates {
            if best.as_ref().is_none_or(|(_, best_size)| size > *best_size) {
                best = Some((path, size));
            }
        }

        best.ok_or_else(|| PipelineError::NoMediaFiles(dir.to_path_buf()))
    }

    fn media_files_in(&self, dir: &Path) -> io::Result<Vec<(PathBuf, u64)>> {
        let mut files = Vec::new();
        for path in sorted_entries(dir)? {
            if !self.is_media(&path) {
                continue;
            }
            let metadata = fs::metadata(&path)?;
            if metadata.is_file() {
                files.push((path, metadata.len()));
            }
        }
        Ok(files)
    }

    /// Sidecars next to the main file. For a single-file item the folder is
    /// shared with other drops, so only names starting with the main stem count.
    fn find_associated(&self, main: &Path, single_file: bool) -> io::Result<Vec<PathBuf>> {
        let Some(dir) = main.parent() else {
            return Ok(Vec::new());
        };
        let main_stem = main
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut sidecars = Vec::new();
        for path in sorted_entries(dir)? {
            if path == main || !path.is_file() || !has_extension(&path, &self.associated_extensions) {
                continue;
            }
            if single_file {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                if !name.is_some_and(|n| n.starts_with(&main_stem)) {
                    continue;
                }
            }
            sidecars.push(path);
        }
        Ok(sidecars)
    }

    fn move_associated(&self, sidecar: &Path, old_stem: &str, new_stem: &str, dest_dir: &Path) {
        let Some(ext) = sidecar.extension().map(|e| e.to_string_lossy().into_owned()) else {
            return;
        };
        let sidecar_stem = sidecar
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let name = match language_tag(&sidecar_stem, old_stem) {
            Some(lang) => format!("{new_stem}.{lang}.{ext}"),
            None => format!("{new_stem}.{ext}"),
        };
        let target = dest_dir.join(name);

        if target.exists() {
            tracing::warn!(
                "Skipping associated file {}: {} already exists",
                sidecar.display(),
                target.display()
            );
            return;
        }

        match self.mover.move_file(sidecar, &target) {
            Ok(report) => {
                tracing::info!(
                    "Moved associated file {} -> {}",
                    sidecar.display(),
                    target.display()
                );
                self.record_move(sidecar, &target, &report);
            }
            Err(e) => tracing::warn!(
                "Failed to move associated file {}: {}",
                sidecar.display(),
                e
            ),
        }
    }

    fn is_media(&self, path: &Path) -> bool {
        has_extension(path, &self.media_extensions)
    }
}

/// Two/three-letter language code right before a sidecar's extension,
/// e.g. `en` in `Movie.en.srt`
fn language_tag(sidecar_stem: &str, main_stem: &str) -> Option<String> {
    let tag: &Regex = regex!(r"^[A-Za-z]{2,3}$");

    if !main_stem.is_empty()
        && let Some(rest) = sidecar_stem.strip_prefix(main_stem)
    {
        let candidate = rest.strip_prefix('.')?;
        return tag.is_match(candidate).then(|| candidate.to_lowercase());
    }

    // Unrelated stem: only trust an all-lowercase code, "Movie.Fat" is not a language
    let (_, last) = sidecar_stem.rsplit_once('.')?;
    (tag.is_match(last) && last.chars().all(|c| c.is_ascii_lowercase())).then(|| last.to_string())
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| extensions.contains(&e))
}

fn with_extension_appended(template: &Path, ext: &std::ffi::OsStr) -> PathBuf {
    let mut name = OsString::from(template.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn ensure_writable(dir: &Path) -> Result<(), PipelineError> {
    #[cfg(unix)]
    {
        use nix::unistd::{AccessFlags, access};

        access(dir, AccessFlags::W_OK | AccessFlags::X_OK).map_err(|e| {
            PipelineError::DestinationNotWritable {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }

    #[cfg(not(unix))]
    {
        let readonly = fs::metadata(dir)
            .map(|m| m.permissions().readonly())
            .unwrap_or(true);
        if readonly {
            return Err(PipelineError::DestinationNotWritable {
                path: dir.to_path_buf(),
                reason: "read-only".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MockDisk;
    use crate::hasher::Xxh3Hasher;
    use crate::mover::{DryRunMover, LocalMover, NativeCopyMover};
    use std::time::Duration;
    use tempfile::TempDir;

    const PLENTY: u64 = 1 << 40;

    struct Layout {
        temp: TempDir,
    }

    impl Layout {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::create_dir_all(temp.path().join("drop")).unwrap();
            Self { temp }
        }

        fn drop_dir(&self) -> PathBuf {
            self.temp.path().join("drop")
        }

        fn movies(&self) -> PathBuf {
            self.temp.path().join("Movies")
        }

        fn write(&self, relative: &str, size: usize) -> PathBuf {
            let path = self.drop_dir().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, vec![b'x'; size]).unwrap();
            path
        }

        fn engine(&self, free_bytes: u64) -> TransferEngine {
            self.engine_with(
                Box::new(LocalMover::new(
                    Box::new(NativeCopyMover::new(Box::new(Xxh3Hasher::new()))),
                    Box::new(Xxh3Hasher::new()),
                )),
                free_bytes,
            )
        }

        fn engine_with(&self, mover: Box<dyn Mover>, free_bytes: u64) -> TransferEngine {
            let ext = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
            let history = HistoryLog::new(self.history_path(), Duration::from_millis(100));
            TransferEngine::new(
                self.drop_dir(),
                &ext(&["mkv", "mp4", "avi"]),
                &ext(&["srt", "nfo", "sub"]),
                mover,
                Box::new(MockDisk::new(free_bytes)),
            )
            .with_history(Arc::new(history))
        }

        fn history_path(&self) -> PathBuf {
            self.temp.path().join("history.log")
        }

        fn history(&self) -> String {
            fs::read_to_string(self.history_path()).unwrap_or_default()
        }
    }

    #[test]
    fn test_single_file_movie() {
        let layout = Layout::new();
        let source = layout.write("A.Minecraft.Movie.2025.1080p.WEB-DL.x265-NeoNoir.mkv", 2048);
        let template = layout
            .movies()
            .join("A Minecraft Movie (2025)/A Minecraft Movie (2025)");

        let destination = layout
            .engine(PLENTY)
            .transfer(&source, &template, Category::Movies)
            .unwrap();

        assert_eq!(
            destination,
            layout
                .movies()
                .join("A Minecraft Movie (2025)/A Minecraft Movie (2025).mkv")
        );
        assert!(destination.exists());
        assert!(!source.exists());
    }

    #[test]
    fn test_unsupported_single_file() {
        let layout = Layout::new();
        let source = layout.write("notes.txt", 10);
        let err = layout
            .engine(PLENTY)
            .plan(&source, &layout.movies().join("X/X"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_directory_without_media() {
        let layout = Layout::new();
        layout.write("Some.Folder/readme.txt", 10);
        let err = layout
            .engine(PLENTY)
            .plan(&layout.drop_dir().join("Some.Folder"), &layout.movies().join("X/X"))
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoMediaFiles(_)));
        assert!(err.to_string().contains("no media files found"));
    }

    #[test]
    fn test_largest_media_file_wins() {
        let layout = Layout::new();
        layout.write("Release/sample.mkv", 100);
        layout.write("Release/feature.mkv", 5000);
        layout.write("Release/extras.mp4", 4000);

        let plan = layout
            .engine(PLENTY)
            .plan(&layout.drop_dir().join("Release"), &layout.movies().join("X/X"))
            .unwrap();
        assert!(plan.main_source.ends_with("Release/feature.mkv"));
        assert_eq!(plan.main_size_bytes, 5000);
    }

    #[test]
    fn test_size_tie_keeps_first_by_name() {
        let layout = Layout::new();
        layout.write("Release/b.mkv", 100);
        layout.write("Release/a.mkv", 100);

        let plan = layout
            .engine(PLENTY)
            .plan(&layout.drop_dir().join("Release"), &layout.movies().join("X/X"))
            .unwrap();
        assert!(plan.main_source.ends_with("Release/a.mkv"));
    }

    #[test]
    fn test_wrapper_folder_searched_one_level_deeper() {
        let layout = Layout::new();
        layout.write("Wrapper/Inner/movie.mkv", 300);
        layout.write("Wrapper/info.txt", 10);

        let plan = layout
            .engine(PLENTY)
            .plan(&layout.drop_dir().join("Wrapper"), &layout.movies().join("X/X"))
            .unwrap();
        assert!(plan.main_source.ends_with("Wrapper/Inner/movie.mkv"));
    }

    #[test]
    fn test_two_levels_deep_is_not_found() {
        let layout = Layout::new();
        layout.write("Outer/Middle/Inner/movie.mkv", 300);

        let err = layout
            .engine(PLENTY)
            .plan(&layout.drop_dir().join("Outer"), &layout.movies().join("X/X"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoMediaFiles(_)));
    }

    #[test]
    fn test_insufficient_space_writes_nothing() {
        let layout = Layout::new();
        let source = layout.write("Big.Movie.2020.mkv", 2000);
        let template = layout.movies().join("Big Movie (2020)/Big Movie (2020)");

        // 2000 bytes needs 2 KB; only 1 KB free
        let err = layout
            .engine(1024)
            .transfer(&source, &template, Category::Movies)
            .unwrap_err();

        match &err {
            PipelineError::InsufficientSpace {
                required_kb,
                available_kb,
                ..
            } => {
                assert_eq!(*required_kb, 2);
                assert_eq!(*available_kb, 1);
            }
            other => panic!("Expected InsufficientSpace, got {other}"),
        }
        assert!(err.to_string().contains("insufficient disk space"));
        assert!(source.exists());
        assert!(!layout.movies().exists());
    }

    #[test]
    fn test_directory_item_with_sidecars() {
        let layout = Layout::new();
        layout.write("Movie.Name.2019.1080p/Movie.Name.2019.1080p.mkv", 4096);
        layout.write("Movie.Name.2019.1080p/Movie.Name.2019.1080p.en.srt", 10);
        layout.write("Movie.Name.2019.1080p/Movie.Name.2019.1080p.nfo", 10);
        layout.write("Movie.Name.2019.1080p/random.eng.sub", 10);
        layout.write("Movie.Name.2019.1080p/sample.txt", 10);

        let item = layout.drop_dir().join("Movie.Name.2019.1080p");
        let template = layout.movies().join("Movie Name (2019)/Movie Name (2019)");
        let engine = layout.engine(PLENTY);
        engine.transfer(&item, &template, Category::Movies).unwrap();

        let dest = layout.movies().join("Movie Name (2019)");
        assert!(dest.join("Movie Name (2019).mkv").exists());
        assert!(dest.join("Movie Name (2019).en.srt").exists());
        assert!(dest.join("Movie Name (2019).nfo").exists());
        assert!(dest.join("Movie Name (2019).eng.sub").exists());
        assert!(item.join("sample.txt").exists());
    }

    #[test]
    fn test_single_file_only_takes_matching_sidecars() {
        let layout = Layout::new();
        let source = layout.write("Show.Name.S01E05.720p.mkv", 1000);
        layout.write("Show.Name.S01E05.720p.srt", 10);
        layout.write("Other.Show.S02E01.srt", 10);

        let template = layout
            .temp
            .path()
            .join("Shows/Show Name/Season 01/Show Name S01E05/Show Name - S01E05");
        let destination = layout
            .engine(PLENTY)
            .transfer(&source, &template, Category::Shows)
            .unwrap();

        let dir = destination.parent().unwrap();
        assert!(dir.join("Show Name - S01E05.mkv").exists());
        assert!(dir.join("Show Name - S01E05.srt").exists());
        assert!(layout.drop_dir().join("Other.Show.S02E01.srt").exists());
    }

    #[test]
    fn test_existing_sidecar_target_is_skipped() {
        let layout = Layout::new();
        layout.write("Rel/movie.mkv", 100);
        let sidecar = layout.write("Rel/movie.srt", 10);
        let dest_dir = layout.movies().join("Movie (2001)");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("Movie (2001).srt"), b"keep").unwrap();

        layout
            .engine(PLENTY)
            .transfer(
                &layout.drop_dir().join("Rel"),
                &dest_dir.join("Movie (2001)"),
                Category::Movies,
            )
            .unwrap();

        assert!(sidecar.exists());
        assert_eq!(fs::read(dest_dir.join("Movie (2001).srt")).unwrap(), b"keep");
    }

    #[test]
    fn test_cleanup_removes_emptied_item() {
        let layout = Layout::new();
        layout.write("Rel/Inner/movie.mkv", 100);
        fs::create_dir_all(layout.drop_dir().join("Rel/Empty/Nested")).unwrap();
        let item = layout.drop_dir().join("Rel");
        let engine = layout.engine(PLENTY);

        engine
            .transfer(&item, &layout.movies().join("M/M"), Category::Movies)
            .unwrap();
        engine.cleanup_source(&item);

        assert!(!item.exists());
        assert!(layout.drop_dir().exists());
    }

    #[test]
    fn test_cleanup_keeps_leftovers() {
        let layout = Layout::new();
        layout.write("Rel/movie.mkv", 100);
        layout.write("Rel/Extras/readme.txt", 10);
        fs::create_dir_all(layout.drop_dir().join("Rel/Empty")).unwrap();
        let item = layout.drop_dir().join("Rel");
        let engine = layout.engine(PLENTY);

        engine
            .transfer(&item, &layout.movies().join("M/M"), Category::Movies)
            .unwrap();
        engine.cleanup_source(&item);

        assert!(item.join("Extras/readme.txt").exists());
        assert!(!item.join("Empty").exists());
    }

    #[test]
    fn test_cleanup_never_removes_watch_root() {
        let layout = Layout::new();
        let engine = layout.engine(PLENTY);

        engine.cleanup_source(&layout.drop_dir());
        assert!(layout.drop_dir().exists());

        // A different spelling of the same directory is still the root
        engine.cleanup_source(&layout.drop_dir().join("."));
        assert!(layout.drop_dir().exists());
    }

    #[test]
    fn test_identical_copy_deletion_is_recorded() {
        let layout = Layout::new();
        let source = layout.write("Heat.1995.mkv", 500);
        let dest_dir = layout.movies().join("Heat (1995)");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("Heat (1995).mkv"), vec![b'x'; 500]).unwrap();

        layout
            .engine(PLENTY)
            .transfer(&source, &dest_dir.join("Heat (1995)"), Category::Movies)
            .unwrap();

        assert!(!source.exists());
        let log = layout.history();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("DELETED: "));
        assert!(log.contains("Heat.1995.mkv (identical copy already at "));
    }

    #[test]
    fn test_backup_of_different_file_is_recorded() {
        let layout = Layout::new();
        let source = layout.write("Heat.1995.mkv", 500);
        let dest_dir = layout.movies().join("Heat (1995)");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("Heat (1995).mkv"), b"older cut").unwrap();

        layout
            .engine(PLENTY)
            .transfer(&source, &dest_dir.join("Heat (1995)"), Category::Movies)
            .unwrap();

        let log = layout.history();
        assert!(log.contains("BACKED UP: "));
        assert!(log.contains("Heat (1995).mkv.backup-"));
    }

    #[test]
    fn test_cleanup_records_removed_directories() {
        let layout = Layout::new();
        layout.write("Rel/Inner/movie.mkv", 100);
        let item = layout.drop_dir().join("Rel");
        let engine = layout.engine(PLENTY);

        engine
            .transfer(&item, &layout.movies().join("M/M"), Category::Movies)
            .unwrap();
        engine.cleanup_source(&item);

        let removed: Vec<_> = layout
            .history()
            .lines()
            .filter(|l| l.contains("REMOVED: "))
            .map(String::from)
            .collect();
        assert_eq!(removed.len(), 2);
        assert!(removed[0].contains("Inner"));
        assert!(removed[1].ends_with("Rel (empty after transfer)"));
    }

    #[test]
    fn test_dry_run_leaves_filesystem_alone() {
        let layout = Layout::new();
        layout.write("Rel/movie.mkv", 100);
        layout.write("Rel/movie.srt", 10);
        let item = layout.drop_dir().join("Rel");
        let engine = layout.engine_with(Box::new(DryRunMover), PLENTY);

        let destination = engine
            .transfer(&item, &layout.movies().join("M/M"), Category::Movies)
            .unwrap();
        engine.cleanup_source(&item);

        assert!(engine.is_dry_run());
        assert_eq!(destination, layout.movies().join("M/M.mkv"));
        assert!(!layout.movies().exists());
        assert!(item.join("movie.mkv").exists());
        assert!(item.join("movie.srt").exists());
        assert_eq!(layout.history(), "");
    }

    #[test]
    fn test_language_tags() {
        assert_eq!(language_tag("Movie.en", "Movie"), Some("en".to_string()));
        assert_eq!(language_tag("Movie.ENG", "Movie"), Some("eng".to_string()));
        assert_eq!(language_tag("Movie", "Movie"), None);
        assert_eq!(language_tag("Movie.2020.1080p", "Movie.2020.1080p"), None);
        assert_eq!(language_tag("subs.pt", "Movie"), Some("pt".to_string()));
        assert_eq!(language_tag("The.Big.Fat", "Movie"), None);
        assert_eq!(language_tag("English", "Movie"), None);
    }
}
