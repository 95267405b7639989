use crate::classifier::Category;
use clap::ValueEnum;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Directory,
}

/// Kind of item reported by the caller that discovered it
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ItemType {
    MovieFile,
    MovieFolder,
    ShowFile,
    ShowFolder,
    MediaFolder,
    Torrent,
    GenericFile,
    GenericFolder,
}

impl ItemType {
    /// Category implied by the item type, if any
    pub const fn category_hint(self) -> Option<Category> {
        match self {
            Self::MovieFile | Self::MovieFolder => Some(Category::Movies),
            Self::ShowFile | Self::ShowFolder => Some(Category::Shows),
            Self::MediaFolder | Self::Torrent | Self::GenericFile | Self::GenericFolder => None,
        }
    }

    /// Kind assumed when the item cannot be inspected on disk
    pub const fn kind(self) -> ItemKind {
        match self {
            Self::MovieFolder | Self::ShowFolder | Self::MediaFolder | Self::GenericFolder => {
                ItemKind::Directory
            }
            Self::MovieFile | Self::ShowFile | Self::Torrent | Self::GenericFile => ItemKind::File,
        }
    }
}

/// One unit of work: a file or directory that appeared in the drop folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub path: PathBuf,
    pub kind: ItemKind,
    pub category_hint: Option<Category>,
}

impl MediaItem {
    pub fn new(path: impl Into<PathBuf>, kind: ItemKind, category_hint: Option<Category>) -> Self {
        Self {
            path: path.into(),
            kind,
            category_hint,
        }
    }

    /// Build an item from what is on disk right now
    pub fn from_path(path: impl Into<PathBuf>, category_hint: Option<Category>) -> io::Result<Self> {
        let path = path.into();
        let kind = if fs::metadata(&path)?.is_dir() {
            ItemKind::Directory
        } else {
            ItemKind::File
        };
        Ok(Self::new(path, kind, category_hint))
    }

    /// Name used for classification: the final path component
    pub fn name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.to_string_lossy().into_owned(),
            |n| n.to_string_lossy().into_owned(),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Every top-level entry of `watch_dir`, sorted by name.
///
/// Hidden entries, in-progress `.partial` copies and anything listed in
/// `exclude` (e.g. an error directory nested in the drop folder) are skipped.
pub fn discover_items(watch_dir: &Path, exclude: &[PathBuf]) -> io::Result<Vec<MediaItem>> {
    let excluded: Vec<PathBuf> = exclude
        .iter()
        .filter_map(|p| fs::canonicalize(p).ok())
        .collect();

    let mut items = Vec::new();
    for entry in fs::read_dir(watch_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name.ends_with(".partial") {
            continue;
        }

        let path = entry.path();
        if let Ok(canonical) = fs::canonicalize(&path)
            && excluded.contains(&canonical)
        {
            tracing::debug!("Skipping excluded entry {}", path.display());
            continue;
        }

        match MediaItem::from_path(&path, None) {
            Ok(item) => items.push(item),
            // Vanished between listing and stat
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_item_type_hints() {
        assert_eq!(ItemType::MovieFile.category_hint(), Some(Category::Movies));
        assert_eq!(ItemType::ShowFolder.category_hint(), Some(Category::Shows));
        assert_eq!(ItemType::Torrent.category_hint(), None);
        assert_eq!(ItemType::GenericFolder.category_hint(), None);
        assert_eq!(ItemType::MediaFolder.kind(), ItemKind::Directory);
        assert_eq!(ItemType::Torrent.kind(), ItemKind::File);
    }

    #[test]
    fn test_item_type_cli_names() {
        assert_eq!(
            ItemType::from_str("movie_folder", false).unwrap(),
            ItemType::MovieFolder
        );
        assert_eq!(
            ItemType::from_str("generic_file", false).unwrap(),
            ItemType::GenericFile
        );
        assert!(ItemType::from_str("podcast", false).is_err());
    }

    #[test]
    fn test_from_path_detects_kind() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("Movie.2020.mkv");
        fs::write(&file, b"x").unwrap();

        let item = MediaItem::from_path(&file, None).unwrap();
        assert_eq!(item.kind, ItemKind::File);
        assert_eq!(item.name(), "Movie.2020.mkv");

        let item = MediaItem::from_path(temp.path(), Some(Category::Shows)).unwrap();
        assert_eq!(item.kind, ItemKind::Directory);
        assert_eq!(item.category_hint, Some(Category::Shows));

        assert!(MediaItem::from_path(temp.path().join("missing"), None).is_err());
    }

    #[test]
    fn test_discover_items_skips_hidden_and_excluded() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("B.Movie.2020.mkv"), b"x").unwrap();
        fs::create_dir(root.join("A.Show.S01E01")).unwrap();
        fs::write(root.join(".hidden"), b"x").unwrap();
        fs::write(root.join("C.Movie.2021.mkv.partial"), b"x").unwrap();
        fs::create_dir(root.join("_errors")).unwrap();

        let items = discover_items(root, &[root.join("_errors")]).unwrap();
        let names: Vec<_> = items.iter().map(MediaItem::name).collect();

        assert_eq!(names, vec!["A.Show.S01E01", "B.Movie.2020.mkv"]);
        assert_eq!(items[0].kind, ItemKind::Directory);
        assert_eq!(items[0].category_hint, None);
    }

    #[test]
    fn test_discover_items_missing_root() {
        let temp = TempDir::new().unwrap();
        assert!(discover_items(&temp.path().join("nope"), &[]).is_err());
    }
}
