use chrono::{Datelike, NaiveDate};

use crate::process::utils::clean_str;

/// Year-first layouts; tried before anything ambiguous.
const YEAR_FIRST: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Month-first before day-first for every separator, so "05/06/2023" is
/// May 6th but "13/05/2023" still resolves to May 13th.
const NUMERIC_4Y: &[&str] = &[
    "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y", "%m.%d.%Y", "%d.%m.%Y",
];
const NUMERIC_2Y: &[&str] = &[
    "%m/%d/%y", "%d/%m/%y", "%m-%d-%y", "%d-%m-%y", "%m.%d.%y", "%d.%m.%y",
];

/// Abbreviated (`%b`) then full (`%B`) month names.
const MONTH_NAME: &[&str] = &[
    "%d %b %Y", "%b %d, %Y", "%b %d %Y", "%d-%b-%Y", "%d-%b-%y", "%d %b, %Y",
    "%d %B %Y", "%B %d, %Y", "%B %d %Y", "%d-%B-%Y", "%d %B, %Y",
];

/// Parse a loosely formatted date. Any trailing time-of-day (ISO `T`,
/// RFC 3339 offset, `HH:MM[:SS]`, AM/PM) is discarded. Returns `None` for
/// anything that is not a real calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = strip_time(clean_str(raw)?);
    if s.is_empty() {
        return None;
    }

    if let Some(d) = parse_compact(s) {
        return Some(d);
    }

    for fmt in YEAR_FIRST.iter().chain(NUMERIC_4Y).chain(MONTH_NAME) {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            // "%Y" happily reads "23" as year 23 AD; leave those to "%y".
            if d.year() >= 1000 {
                return Some(d);
            }
        }
    }

    NUMERIC_2Y
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// `"YYYYMMDD"` with no separators.
fn parse_compact(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    if year < 1000 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Cut everything from the separator that precedes the first `HH:` token.
fn strip_time(s: &str) -> &str {
    let Some(colon) = s.find(':') else {
        return s;
    };
    match s[..colon].rfind([' ', 'T']) {
        Some(sep) => s[..sep].trim_end_matches(','),
        None => s,
    }
}
