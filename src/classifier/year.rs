use std::ops::RangeInclusive;

/// Release years outside this window are treated as ordinary numbers
pub const PLAUSIBLE_YEARS: RangeInclusive<u16> = 1920..=2029;

/// Parse a 4-digit year, rejecting anything outside [`PLAUSIBLE_YEARS`]
pub fn parse_year(text: &str) -> Option<u16> {
    if text.len() != 4 {
        return None;
    }
    text.parse::<u16>()
        .ok()
        .filter(|year| PLAUSIBLE_YEARS.contains(year))
}
