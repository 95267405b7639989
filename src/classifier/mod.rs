//! Pattern-based classification of release names into Movies or Shows
//!
//! The chain is: strip known extension -> decide category -> strip tags ->
//! extract year -> extract season/episode -> title-case and sanitize. Each stage
//! lives in its own function and is tested on its own.

mod movie;
mod sanitize;
mod show;
mod year;

pub use movie::{MovieTitle, extract_movie};
pub use sanitize::{
    DEFAULT_TAG_BLACKLIST, TagBlacklist, UNKNOWN_MOVIE, UNKNOWN_SHOW, sanitize_filename,
    title_case,
};
pub use show::{EpisodeToken, ShowTitle, extract_show, find_episode_token};
pub use year::{PLAUSIBLE_YEARS, parse_year};

use lazy_regex::{Regex, regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Movies,
    Shows,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movies => "Movies",
            Self::Shows => "Shows",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Only the exact strings "Movies" and "Shows" are hints
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Movies" => Ok(Self::Movies),
            "Shows" => Ok(Self::Shows),
            other => Err(format!("unknown category '{other}' (expected Movies or Shows)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("could not resolve a title from {name:?}")]
    NoTitle { name: String },

    #[error("no season/episode marker found in {name:?}")]
    NoEpisodeToken { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeNumber {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeNumber {
    /// `S01E05`; episodes from 100 up keep their natural width
    pub fn tag(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// Outcome of classifying one item name.
///
/// `episode` is `Some` exactly when `category` is [`Category::Shows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub category: Category,
    pub title: String,
    pub year: Option<u16>,
    pub episode: Option<EpisodeNumber>,
}

impl ClassificationResult {
    pub fn movie(title: String, year: Option<u16>) -> Self {
        Self {
            category: Category::Movies,
            title,
            year,
            episode: None,
        }
    }

    pub fn show(title: String, year: Option<u16>, season: u32, episode: u32) -> Self {
        Self {
            category: Category::Shows,
            title,
            year,
            episode: Some(EpisodeNumber { season, episode }),
        }
    }

    /// "Title (Year)" when a year is known, else "Title"
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({year})", self.title),
            None => self.title.clone(),
        }
    }

    pub fn episode_tag(&self) -> Option<String> {
        self.episode.map(|e| e.tag())
    }

    /// Library path of the main file, without extension.
    ///
    /// Movies: `<movies>/<Title (Year)>/<Title (Year)>`
    /// Shows:  `<shows>/<Title>/Season NN/<Title> SxxEyy/<Title> - SxxEyy`
    pub fn destination_template(&self, movies_root: &Path, shows_root: &Path) -> PathBuf {
        let display = self.display_title();
        match self.episode {
            Some(episode) => {
                let tag = episode.tag();
                shows_root
                    .join(&display)
                    .join(format!("Season {:02}", episode.season))
                    .join(format!("{display} {tag}"))
                    .join(format!("{display} - {tag}"))
            }
            None => movies_root.join(&display).join(&display),
        }
    }
}

/// Decide Movies vs Shows from the name alone. No marker means Movies.
pub fn detect_category(name: &str) -> Category {
    let markers: &Regex = regex!(
        r"(?i)(?:^|[^a-z])s\d{1,3}[ ._-]?e\d{1,4}|\b\d{1,2}x\d{2,3}\b|\bseason[ ._-]?pack\b|\bseason[ ._-]?\d{1,3}\b|\bepisode[ ._-]?\d{1,4}\b|\bpart[ ._-]?\d{1,2}\b|\bseries\b|\bshow\b"
    );
    if markers.is_match(name) {
        Category::Shows
    } else {
        Category::Movies
    }
}

/// Classifier configured with the tag blacklist and known media extensions
#[derive(Debug, Clone)]
pub struct Classifier {
    blacklist: TagBlacklist,
    media_extensions: Vec<String>,
}

impl Classifier {
    pub fn new(blacklist: TagBlacklist, media_extensions: Vec<String>) -> Self {
        let media_extensions = media_extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        Self {
            blacklist,
            media_extensions,
        }
    }

    /// Classify a raw item name.
    ///
    /// A hint of Movies or Shows is trusted as-is, even when the name carries
    /// contradicting markers. Without a hint, a name that only matched a weak
    /// show keyword but has no season/episode marker is treated as a movie.
    pub fn classify(
        &self,
        raw_name: &str,
        hint: Option<Category>,
    ) -> Result<ClassificationResult, ClassifyError> {
        let name = self.strip_media_extension(raw_name);

        let category = hint.unwrap_or_else(|| detect_category(name));

        let result = match category {
            Category::Movies => self.classify_movie(name)?,
            Category::Shows => match find_episode_token(name) {
                Some(token) => {
                    let show = extract_show(name, &token, &self.blacklist);
                    ClassificationResult::show(show.title, show.year, token.season, token.episode)
                }
                None if hint.is_none() => {
                    tracing::debug!(
                        "'{}' matched a show keyword but has no episode marker, classifying as movie",
                        name
                    );
                    self.classify_movie(name)?
                }
                None => {
                    return Err(ClassifyError::NoEpisodeToken {
                        name: raw_name.to_string(),
                    });
                }
            },
        };

        tracing::info!(
            "Classified '{}' as {}: {}{}",
            raw_name,
            result.category,
            result.display_title(),
            result
                .episode_tag()
                .map(|tag| format!(" {tag}"))
                .unwrap_or_default()
        );

        Ok(result)
    }

    fn classify_movie(&self, name: &str) -> Result<ClassificationResult, ClassifyError> {
        let movie = extract_movie(name, &self.blacklist);
        if movie.title == UNKNOWN_MOVIE {
            return Err(ClassifyError::NoTitle {
                name: name.to_string(),
            });
        }
        Ok(ClassificationResult::movie(movie.title, movie.year))
    }

    fn strip_media_extension<'a>(&self, name: &'a str) -> &'a str {
        match name.rsplit_once('.') {
            Some((stem, ext))
                if !stem.is_empty() && self.media_extensions.contains(&ext.to_lowercase()) =>
            {
                stem
            }
            _ => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(
            TagBlacklist::new(DEFAULT_TAG_BLACKLIST).unwrap(),
            vec!["mkv".to_string(), ".mp4".to_string(), "avi".to_string()],
        )
    }

    #[test]
    fn test_minecraft_movie_destination() {
        let result = classifier()
            .classify("A.Minecraft.Movie.2025.1080p.WEB-DL.x265-NeoNoir.mkv", None)
            .unwrap();

        assert_eq!(result.category, Category::Movies);
        assert_eq!(result.display_title(), "A Minecraft Movie (2025)");
        assert_eq!(
            result.destination_template(Path::new("Movies"), Path::new("Shows")),
            PathBuf::from("Movies/A Minecraft Movie (2025)/A Minecraft Movie (2025)")
        );
    }

    #[test]
    fn test_show_episode_destination() {
        let result = classifier().classify("Show.Name.S01E05.720p.mkv", None).unwrap();

        assert_eq!(result.category, Category::Shows);
        assert_eq!(result.title, "Show Name");
        assert_eq!(result.episode_tag().as_deref(), Some("S01E05"));
        assert_eq!(
            result.destination_template(Path::new("Movies"), Path::new("Shows")),
            PathBuf::from("Shows/Show Name/Season 01/Show Name S01E05/Show Name - S01E05")
        );
    }

    #[test]
    fn test_episode_padding() {
        let tag = |season, episode| EpisodeNumber { season, episode }.tag();
        assert_eq!(tag(1, 5), "S01E05");
        assert_eq!(tag(12, 99), "S12E99");
        assert_eq!(tag(1, 100), "S01E100");
        assert_eq!(tag(3, 1234), "S03E1234");
    }

    #[test]
    fn test_episode_markers_always_mean_shows() {
        let c = classifier();
        for name in [
            "show.s1e1.mkv",
            "Another Show S02E10",
            "Long.Runner.S10E150.HDTV",
            "Doctor.Who.2005.S13E01.1080p",
        ] {
            let result = c.classify(name, None).unwrap();
            assert_eq!(result.category, Category::Shows, "{name}");
            let tag = result.episode_tag().unwrap();
            assert!(tag.len() >= "S01E01".len(), "{name}: {tag}");
        }
    }

    #[test]
    fn test_names_without_markers_are_movies() {
        let c = classifier();
        for name in [
            "Inception.2010.1080p.BluRay.x264-GRP.mkv",
            "Arrival (2016)",
            "Some Home Video",
        ] {
            assert_eq!(c.classify(name, None).unwrap().category, Category::Movies, "{name}");
        }
    }

    #[test]
    fn test_detect_category_keywords() {
        assert_eq!(detect_category("Show.Name.S01E05"), Category::Shows);
        assert_eq!(detect_category("Great Series Complete"), Category::Shows);
        assert_eq!(detect_category("Show Name Season 2"), Category::Shows);
        assert_eq!(detect_category("Show Name Season Pack"), Category::Shows);
        assert_eq!(detect_category("Documentary Part 2"), Category::Shows);
        assert_eq!(detect_category("Documentary Episode 4"), Category::Shows);
        assert_eq!(detect_category("Plain.Movie.2019"), Category::Movies);
        assert_eq!(detect_category("Mass3E2.Legendary.Edition.2021"), Category::Movies);
    }

    #[test]
    fn test_keyword_without_episode_marker_falls_back_to_movie() {
        let result = classifier()
            .classify("The.Truman.Show.1998.1080p.BluRay.mkv", None)
            .unwrap();
        assert_eq!(result.category, Category::Movies);
        assert_eq!(result.display_title(), "The Truman Show (1998)");
    }

    #[test]
    fn test_hint_is_trusted_over_markers() {
        let result = classifier()
            .classify("Weird.Name.S01E02.mkv", Some(Category::Movies))
            .unwrap();
        assert_eq!(result.category, Category::Movies);
        assert!(result.episode.is_none());
    }

    #[test]
    fn test_shows_hint_without_marker_fails() {
        let err = classifier()
            .classify("Some.Show.Complete", Some(Category::Shows))
            .unwrap_err();
        assert!(matches!(err, ClassifyError::NoEpisodeToken { .. }));
    }

    #[test]
    fn test_unresolvable_movie_title_fails() {
        let err = classifier().classify("1080p.x264.mkv", None).unwrap_err();
        assert!(matches!(err, ClassifyError::NoTitle { .. }));
    }

    #[test]
    fn test_placeholder_show_with_marker_succeeds() {
        let result = classifier().classify("S01E01.mkv", None).unwrap();
        assert_eq!(result.title, UNKNOWN_SHOW);
        assert_eq!(result.episode_tag().as_deref(), Some("S01E01"));
    }

    #[test]
    fn test_reclassifying_display_title_keeps_year() {
        let c = classifier();
        let first = c
            .classify("Dune.Part.Two.2024.2160p.WEB-DL.DDP5.1.mkv", Some(Category::Movies))
            .unwrap();
        let second = c.classify(&first.display_title(), Some(Category::Movies)).unwrap();
        assert_eq!(first.year, Some(2024));
        assert_eq!(second.year, first.year);
        assert_eq!(second.title, first.title);
    }

    #[test]
    fn test_unknown_extension_is_name_text() {
        let result = classifier().classify("Movie.Title.2001.x264-GRP", None).unwrap();
        assert_eq!(result.display_title(), "Movie Title (2001)");
    }

    #[test]
    fn test_category_from_str_is_exact() {
        assert_eq!("Movies".parse::<Category>(), Ok(Category::Movies));
        assert_eq!("Shows".parse::<Category>(), Ok(Category::Shows));
        assert!("movies".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }
}
