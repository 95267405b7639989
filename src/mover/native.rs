// In-process copy for hosts without rsync

use super::{
    MoveReport, Mover, PartialFile, Prepared, ensure_source_exists, finalize_copy,
    prepare_destination,
};
use crate::hasher::Hasher;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

const BUFFER_SIZE: usize = 1024 * 1024;

/// Streaming copy into `<dest>.partial`, verified by checksum before the
/// atomic rename and source removal
pub struct NativeCopyMover {
    hasher: Box<dyn Hasher>,
}

impl NativeCopyMover {
    pub fn new(hasher: Box<dyn Hasher>) -> Self {
        Self { hasher }
    }
}

impl Mover for NativeCopyMover {
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

        {
            let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(source)?);
            let out = File::create(partial.path())?;
            let mut writer = BufWriter::with_capacity(BUFFER_SIZE, out);
            io::copy(&mut reader, &mut writer)?;
            writer.flush()?;
            let out = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
            out.sync_all()?;
            fs::set_permissions(partial.path(), before.permissions())?;
        }

        finalize_copy(source, &before, partial, destination, self.hasher.as_ref())?;
        Ok(MoveReport::Moved { backup })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Xxh3Hasher;
    use tempfile::TempDir;

    fn mover() -> NativeCopyMover {
        NativeCopyMover::new(Box::new(Xxh3Hasher::new()))
    }

    #[test]
    fn test_native_copy_moves_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("drop/episode.mkv");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        let data = vec![0xABu8; 3 * BUFFER_SIZE + 5];
        fs::write(&source, &data).unwrap();

        let destination = temp.path().join("Shows/Show/Season 01/Show - S01E01.mkv");
        mover().move_file(&source, &destination).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(&destination).unwrap(), data);
        assert!(
            !destination
                .with_file_name("Show - S01E01.mkv.partial")
                .exists()
        );
    }

    #[test]
    fn test_native_copy_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.mkv");
        fs::write(&source, b"test").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o640)).unwrap();

        let destination = temp.path().join("out/dest.mkv");
        mover().move_file(&source, &destination).unwrap();

        let mode = fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_native_copy_missing_source_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("dest.mkv");

        let err = mover()
            .move_file(&temp.path().join("missing.mkv"), &destination)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!destination.exists());
        assert!(!temp.path().join("dest.mkv.partial").exists());
    }
}
