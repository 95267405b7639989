//! Name cleanup shared by the movie and show extractors

use regex::{Regex, RegexBuilder};

pub const UNKNOWN_MOVIE: &str = "Unknown Movie";
pub const UNKNOWN_SHOW: &str = "Unknown Show";

/// Quality, codec, source and container tokens commonly found in release names.
/// Matched case-insensitively against names whose separators are already spaces.
pub const DEFAULT_TAG_BLACKLIST: &str = r"\b(?:2160p|1440p|1080p|1080i|720p|576p|480p|4k|uhd|hdr10\+?|hdr|dovi|sdr|web[- ]?dl|web[- ]?rip|blu[- ]?ray|bdrip|brrip|bdremux|remux|dvdrip|dvdscr|hdtv|hdrip|hdcam|x264|x265|h[ .]?264|h[ .]?265|hevc|avc|xvid|divx|av1|vp9|10bit|8bit|aac(?:[ .]?[257][ .]?[01])?|e-?ac-?3|ac3|ddp?(?:[ .]?[257][ .]?[01])?|dts(?:-hd)?(?: ma)?|truehd|atmos|flac|opus|proper|repack|rerip|extended|unrated|remastered|internal|imax|amzn|nf|dsnp|hmax|atvp|pcok|dual[- ]audio|subbed|dubbed|mkv|mp4|avi|m4v)\b";

/// Characters that are unsafe in file names and what replaces them.
const SUBSTITUTIONS: &[(char, &str)] = &[
    (':', " -"),
    ('/', "-"),
    ('\\', "-"),
    ('*', "-"),
    ('|', "-"),
    ('?', ""),
    ('<', ""),
    ('>', ""),
    ('"', "'"),
];

/// Case-insensitive regular expression stripping release tags from a name
#[derive(Debug, Clone)]
pub struct TagBlacklist {
    pattern: Regex,
}

impl TagBlacklist {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern })
    }

    /// Remove every blacklisted token and collapse the whitespace left behind
    pub fn strip(&self, text: &str) -> String {
        collapse_whitespace(&self.pattern.replace_all(text, " "))
    }
}

/// Make `name` safe to use as a path component.
///
/// Unsafe characters go through a fixed substitution table, control characters
/// become spaces, whitespace is collapsed and leading/trailing dots are trimmed.
/// An empty result becomes `placeholder`.
pub fn sanitize_filename(name: &str, placeholder: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None if c.is_control() => out.push(' '),
            None => out.push(c),
        }
    }

    let collapsed = collapse_whitespace(&out);
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c.is_whitespace());

    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-case the first letter of every word, leaving the rest untouched.
/// Hyphens start a new word so `spider-man` becomes `Spider-Man`.
pub fn title_case(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let mut out = String::with_capacity(collapsed.len());
    let mut at_word_start = true;

    for c in collapsed.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace() || c == '-';
    }

    out
}

/// Scene names use dots and underscores where humans use spaces
pub fn separators_to_spaces(text: &str) -> String {
    text.replace(['.', '_'], " ")
}

/// Trim dangling dashes and spaces left over after tokens were removed
pub fn trim_dangling(text: &str) -> &str {
    text.trim_matches(|c: char| c == '-' || c.is_whitespace())
}
