use super::sanitize::{
    TagBlacklist, UNKNOWN_SHOW, collapse_whitespace, sanitize_filename, separators_to_spaces,
    title_case, trim_dangling,
};
use super::year::parse_year;
use lazy_regex::{Regex, regex};

/// Season/episode marker located inside a release name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeToken {
    pub season: u32,
    pub episode: u32,
    /// Byte offset where the marker starts in the searched name
    pub start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowTitle {
    pub title: String,
    pub year: Option<u16>,
}

/// Find the first season/episode marker.
///
/// Supported formats, in order of preference:
/// - Scene: "Show.Name.S01E05.1080p" (1-3 digit season, 1-4 digit episode)
/// - Cross: "Show Name 1x05"
/// - Verbose: "Show Name Season 1 Episode 5"
///
/// Season 0 is accepted for specials; episode 0 is not a valid marker.
pub fn find_episode_token(name: &str) -> Option<EpisodeToken> {
    // The S must not continue a word: "Mass3E2" is not season 3
    let scene: &Regex =
        regex!(r"(?i)(?:^|[^a-z])(?P<marker>s(?P<season>\d{1,3})[ ._-]?e(?P<episode>\d{1,4}))");
    let cross: &Regex = regex!(r"(?i)\b(?P<marker>(?P<season>\d{1,2})x(?P<episode>\d{2,3}))\b");
    let verbose: &Regex = regex!(
        r"(?i)\b(?P<marker>season[ ._-]*(?P<season>\d{1,3})[ ._-]*(?:episode|ep)[ ._-]*(?P<episode>\d{1,4}))"
    );

    [scene, cross, verbose].into_iter().find_map(|re| {
        let caps = re.captures(name)?;
        let season: u32 = caps.name("season")?.as_str().parse().ok()?;
        let episode: u32 = caps.name("episode")?.as_str().parse().ok()?;
        if episode == 0 {
            return None;
        }
        Some(EpisodeToken {
            season,
            episode,
            start: caps.name("marker")?.start(),
        })
    })
}

/// Derive the show title (and optional year) from the text before `token`
pub fn extract_show(name: &str, token: &EpisodeToken, blacklist: &TagBlacklist) -> ShowTitle {
    let prefix = &name[..token.start];
    let primary = clean_prefix(prefix, blacklist);

    if primary.title != UNKNOWN_SHOW {
        return primary;
    }

    // Bare "Name.S01E01": the leading alphanumeric run is the title
    let bare: &Regex = regex!(r"^([A-Za-z0-9]+)\.[Ss]\d{1,3}[Ee]\d{1,4}");
    if let Some(title) = bare.captures(name).and_then(|c| c.get(1)) {
        return ShowTitle {
            title: sanitize_filename(title.as_str(), UNKNOWN_SHOW),
            year: None,
        };
    }

    ShowTitle {
        title: sanitize_filename(trim_dangling(&separators_to_spaces(prefix)), UNKNOWN_SHOW),
        year: None,
    }
}

fn clean_prefix(prefix: &str, blacklist: &TagBlacklist) -> ShowTitle {
    let site: &Regex =
        regex!(r"(?i)^\s*[\[(]?\s*www\.[a-z0-9-]+(?:\.[a-z0-9-]+)+\s*[\])]?\s*-?\s*");
    let without_site = site.replace(prefix, "");

    let group_tag: &Regex = regex!(r"^\s*\[[^\]]*\]\s*");
    let without_group_tag = group_tag.replace(&without_site, "");

    let mut base = without_group_tag.trim_end_matches(['.', '_', ' ', '-']).to_string();
    if base.contains(['.', '_']) {
        let group: &Regex = regex!(r"-[A-Za-z0-9]+$");
        base = group.replace(&base, "").into_owned();
    }

    let lowered = blacklist.strip(&separators_to_spaces(&base).to_lowercase());
    let lowered = collapse_whitespace(trim_dangling(&lowered));

    let (title, year) = split_show_year(&lowered);

    ShowTitle {
        title: sanitize_filename(&title_case(trim_dangling(title)), UNKNOWN_SHOW),
        year,
    }
}

/// A trailing year belongs to the show unless it reads as "season 2019"
fn split_show_year(text: &str) -> (&str, Option<u16>) {
    let re: &Regex = regex!(r"^(.*?)[\s(\[]*((?:19|20)\d{2})[)\]]?$");

    let Some(caps) = re.captures(text) else {
        return (text, None);
    };
    let (Some(before), Some(year)) = (caps.get(1), caps.get(2)) else {
        return (text, None);
    };

    let before = before.as_str().trim();
    if before.is_empty() {
        return (text, None);
    }

    let last_word = before.rsplit(' ').next().unwrap_or_default();
    if matches!(last_word, "season" | "series" | "saison" | "staffel") {
        return (text, None);
    }

    match parse_year(year.as_str()) {
        Some(year) => (before, Some(year)),
        None => (text, None),
    }
}
