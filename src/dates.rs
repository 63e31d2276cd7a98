//! Feed date parsing.
//!
//! Feeds publish dates in whatever shape their CMS produces: RFC 2822,
//! ISO 8601, or loose forms such as `Oct 15, 2026 8:00 AM EST`. [`parse_date`]
//! tries a fixed list of grammars and resolves the zone:
//!
//! - numeric offsets (`+0700`, `-05:00`, `Z`) are taken literally, and so are
//!   `GMT+7` / `UTC+07:00` suffixes (`GMT+7` is seven hours east of UTC)
//! - a trailing abbreviation from [`ZONE_ABBREVIATIONS`] selects a region and
//!   the wall-clock time is localized there
//! - no zone information at all means UTC
//!
//! An abbreviation names a region, not an offset: `EST` and `EDT` both map to
//! `America/New_York`, so `EST` in July resolves to `-04:00`. This is a known
//! imprecision kept for compatibility with existing reports.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Timezone abbreviations recognized at the end of a date string.
pub const ZONE_ABBREVIATIONS: &[(&str, Tz)] = &[
    ("UTC", Tz::UTC),
    ("GMT", Tz::UTC),
    ("EST", Tz::America__New_York),
    ("EDT", Tz::America__New_York),
    ("CST", Tz::America__Chicago),
    ("CDT", Tz::America__Chicago),
    ("MST", Tz::America__Denver),
    ("MDT", Tz::America__Denver),
    ("PST", Tz::America__Los_Angeles),
    ("PDT", Tz::America__Los_Angeles),
    ("BST", Tz::Europe__London),
    ("CET", Tz::Europe__Paris),
    ("CEST", Tz::Europe__Paris),
    ("ICT", Tz::Asia__Bangkok),
    ("SGT", Tz::Asia__Singapore),
    ("JST", Tz::Asia__Tokyo),
    ("IST", Tz::Asia__Kolkata),
];

static ZONES: Lazy<HashMap<&'static str, Tz>> =
    Lazy::new(|| ZONE_ABBREVIATIONS.iter().copied().collect());

/// `GMT+7`, `UTC-05:30`, `gmt+0700`.
static PREFIXED_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:GMT|UTC)([+-])(\d{1,2})(?::?(\d{2}))?$").expect("static regex")
});

/// Grammars carrying an explicit numeric offset.
const OFFSET_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Grammars without zone information.
const NAIVE_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%b %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M:%S %p",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
    "%b %d %Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Date-only grammars; the time is midnight.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%a, %d %b %Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
];

/// Parse a feed-supplied date into an absolute timestamp.
///
/// Returns `None` when no grammar matches; the caller drops the item.
pub fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    if let Some((rest, abbr)) = text.rsplit_once(' ') {
        if let Some(offset) = prefixed_offset(abbr) {
            let naive = parse_naive(rest)?;
            return offset.from_local_datetime(&naive).single();
        }
        if is_zone_abbreviation(abbr) {
            let naive = parse_naive(rest)?;
            return match ZONES.get(abbr.to_ascii_uppercase().as_str()) {
                Some(tz) => Some(localize(tz, &naive)),
                None => {
                    debug!(%abbr, "Unknown timezone abbreviation; assuming UTC");
                    Some(Utc.from_utc_datetime(&naive).fixed_offset())
                }
            };
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&text) {
        return Some(dt);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&text, fmt) {
            return Some(dt);
        }
    }

    let naive = parse_naive(&text)?;
    Some(Utc.from_utc_datetime(&naive).fixed_offset())
}

/// Offset of `tz` at the given wall-clock time, as a fixed-offset timestamp.
fn localize(tz: &Tz, naive: &NaiveDateTime) -> DateTime<FixedOffset> {
    match tz.from_local_datetime(naive).earliest() {
        Some(dt) => dt.fixed_offset(),
        // Wall-clock time skipped by a DST jump: read it with the pre-jump offset.
        None => tz
            .from_local_datetime(&(*naive + TimeDelta::hours(1)))
            .earliest()
            .map(|dt| dt.fixed_offset())
            .unwrap_or_else(|| Utc.from_utc_datetime(naive).fixed_offset()),
    }
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Literal offset of a `GMT±H[:MM]` / `UTC±H[:MM]` token.
fn prefixed_offset(token: &str) -> Option<FixedOffset> {
    let caps = PREFIXED_OFFSET.captures(token)?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if minutes >= 60 {
        return None;
    }
    let secs = hours * 3600 + minutes * 60;
    match &caps[1] {
        "-" => FixedOffset::west_opt(secs),
        _ => FixedOffset::east_opt(secs),
    }
}

/// A trailing token that looks like a zone name rather than part of the date:
/// 2-5 ASCII letters that are not an AM/PM marker.
fn is_zone_abbreviation(token: &str) -> bool {
    (2..=5).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_alphabetic())
        && !token.eq_ignore_ascii_case("am")
        && !token.eq_ignore_ascii_case("pm")
        && !token.eq_ignore_ascii_case("z")
}
