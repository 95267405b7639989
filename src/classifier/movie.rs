use super::sanitize::{
    TagBlacklist, UNKNOWN_MOVIE, sanitize_filename, separators_to_spaces, title_case,
    trim_dangling,
};
use super::year::parse_year;
use lazy_regex::{Regex, regex};

/// More text than this after a year means the year is part of the title
const MAX_TEXT_AFTER_YEAR: usize = 15;

/// Trailing text allowed after an explicit `Title (YYYY)` for it to be authoritative
const MAX_TEXT_AFTER_PAREN_YEAR: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieTitle {
    pub title: String,
    pub year: Option<u16>,
}

/// Extract a movie title and release year from a release name (extension already removed)
pub fn extract_movie(name: &str, blacklist: &TagBlacklist) -> MovieTitle {
    if let Some(explicit) = explicit_title_year(name, blacklist) {
        return explicit;
    }

    let mut base = name.to_string();
    if base.contains(['.', '_']) {
        base = strip_release_group(&base).to_string();
    }

    let spaced = strip_brackets(&separators_to_spaces(&base));
    let cleaned = blacklist.strip(&spaced.to_lowercase());
    let cleaned = trim_dangling(&cleaned);

    let (title, year) = split_trailing_year(cleaned);

    MovieTitle {
        title: sanitize_filename(&title_case(trim_dangling(title)), UNKNOWN_MOVIE),
        year,
    }
}

/// `Title (YYYY)` with little after it is taken as already-organized and trusted
fn explicit_title_year(name: &str, blacklist: &TagBlacklist) -> Option<MovieTitle> {
    let re: &Regex = regex!(r"^(.+?)[\s._]*\(((?:19|20)\d{2})\)(.*)$");
    let caps = re.captures(name)?;

    let remainder = caps.get(3)?.as_str().trim();
    if remainder.chars().count() >= MAX_TEXT_AFTER_PAREN_YEAR {
        return None;
    }

    let year = parse_year(caps.get(2)?.as_str())?;
    let title = blacklist.strip(&separators_to_spaces(caps.get(1)?.as_str()));
    let title = sanitize_filename(&title_case(trim_dangling(&title)), UNKNOWN_MOVIE);

    Some(MovieTitle {
        title,
        year: Some(year),
    })
}

/// Pick the last year-looking token; it is the release year only if little follows it
fn split_trailing_year(cleaned: &str) -> (&str, Option<u16>) {
    let re: &Regex = regex!(r"\b(?:19|20)\d{2}\b");

    let Some(m) = re.find_iter(cleaned).last() else {
        return (cleaned, None);
    };

    let trailing = cleaned[m.end()..].trim();
    if trailing.chars().count() > MAX_TEXT_AFTER_YEAR {
        tracing::debug!(
            "Year {} in '{}' is followed by '{}', treating it as part of the title",
            m.as_str(),
            cleaned,
            trailing
        );
        return (cleaned, None);
    }

    let before = cleaned[..m.start()].trim();
    match parse_year(m.as_str()) {
        Some(year) if !before.is_empty() => (before, Some(year)),
        _ => (cleaned, None),
    }
}

/// Drop a scene `-GROUP` suffix
fn strip_release_group(name: &str) -> &str {
    let re: &Regex = regex!(r"-[A-Za-z0-9]+$");
    re.find(name).map_or(name, |m| &name[..m.start()])
}

/// Remove `[...]`/`{...}` annotations and non-year `(...)` annotations.
/// A parenthesized year is unwrapped so the year scan still sees it.
fn strip_brackets(text: &str) -> String {
    let square: &Regex = regex!(r"\[[^\]]*\]|\{[^}]*\}");
    let without_square = square.replace_all(text, " ");

    let paren: &Regex = regex!(r"\(([^)]*)\)");
    paren
        .replace_all(&without_square, |caps: &regex::Captures| {
            let inner = caps.get(1).map_or("", |m| m.as_str()).trim();
            if inner.len() == 4 && inner.chars().all(|c| c.is_ascii_digit()) {
                format!(" {inner} ")
            } else {
                " ".to_string()
            }
        })
        .into_owned()
}
