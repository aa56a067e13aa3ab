// src/normalize.rs
//! Date and text normalization for raw listing fields.
//!
//! `normalize_date_at` turns whatever the listing page showed into a
//! [`PostedDate`]. Attempt order:
//! 1. full timestamp or date (RFC 3339, ISO with or without time, `MM/DD/YYYY`,
//!    RFC 2822), truncated to the calendar date as written;
//! 2. the first token in the text that forms a valid date: `M/D/YYYY` as
//!    written, or `M/D` in the current year, moved back one year when it
//!    lands more than [`FUTURE_TOLERANCE_DAYS`] in the future;
//! 3. the sentinel.
//!
//! Never fails. Idempotent over its own output.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::lead::PostedDate;

/// A month/day token may sit this far past "today" before it is read as last year.
pub const FUTURE_TOLERANCE_DAYS: i64 = 2;

/// Cap for cleaned listing text (titles are short; this only guards garbage).
pub const MAX_TEXT_CHARS: usize = 500;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// `M/D`, optionally followed by `/YYYY`. Boundaries are checked in
/// [`standalone`] so candidates can be scanned one after another.
static RE_MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2})/([0-9]{1,2})(?:/([0-9]{4}))?").expect("month/day regex")
});

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize against the local calendar date.
pub fn normalize_date(raw: &str) -> PostedDate {
    normalize_date_at(raw, Local::now().date_naive())
}

/// Absent input is the sentinel.
pub fn normalize_opt_date_at(raw: Option<&str>, today: NaiveDate) -> PostedDate {
    raw.map(|r| normalize_date_at(r, today)).unwrap_or_default()
}

pub fn normalize_date_at(raw: &str, today: NaiveDate) -> PostedDate {
    let s = raw.trim();
    if s.is_empty() {
        return PostedDate::UnknownOld;
    }

    let parsed = parse_full(s).or_else(|| parse_month_day(s, today));
    match parsed {
        Some(d) if d > epoch_date() => PostedDate::Known(d),
        _ => PostedDate::UnknownOld,
    }
}

fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

fn parse_full(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    OffsetDateTime::parse(s, &Rfc2822).ok().and_then(|dt| {
        let d = dt.date();
        NaiveDate::from_ymd_opt(d.year(), u8::from(d.month()) as u32, d.day() as u32)
    })
}

/// First token in the text that forms a valid date: `M/D/YYYY` as written,
/// `M/D` relative to `today`.
fn parse_month_day(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    RE_MONTH_DAY.captures_iter(s).find_map(|caps| {
        let whole = caps.get(0)?;
        if !standalone(s, whole.start(), whole.end()) {
            return None;
        }
        let month: u32 = caps.get(1)?.as_str().parse().ok()?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        match caps.get(3) {
            Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day),
            None => month_day_near(today, month, day),
        }
    })
}

/// Not glued to other digits or slashes (`2026/2/10`, `1/2/3`).
fn standalone(s: &str, start: usize, end: usize) -> bool {
    let glued = |c: char| c.is_ascii_digit() || c == '/';
    let before = s[..start].chars().next_back();
    let after = s[end..].chars().next();
    !before.is_some_and(glued) && !after.is_some_and(glued)
}

fn month_day_near(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year > today + Duration::days(FUTURE_TOLERANCE_DAYS) {
        // Year-boundary wraparound: "12/30" seen on Jan 2nd is last December.
        NaiveDate::from_ymd_opt(today.year() - 1, month, day)
    } else {
        Some(this_year)
    }
}

/// Clean listing text: decode entities, strip tags, fold quotes and whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let stripped = RE_TAGS.replace_all(&decoded, "");
    let folded = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let mut out = RE_WS.replace_all(&folded, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iso_timestamp_truncates_to_date() {
        let today = day(2026, 2, 14);
        assert_eq!(
            normalize_date_at("2026-02-11T08:23:18.007147", today),
            PostedDate::Known(day(2026, 2, 11))
        );
        assert_eq!(
            normalize_date_at("2026-02-10 14:32", today),
            PostedDate::Known(day(2026, 2, 10))
        );
        assert_eq!(
            normalize_date_at("2026-02-09T23:10:00-05:00", today),
            PostedDate::Known(day(2026, 2, 9))
        );
    }

    #[test]
    fn month_day_token_in_meta_text() {
        let today = day(2026, 2, 14);
        assert_eq!(
            normalize_date_at("2/10\nBOCA RATON", today),
            PostedDate::Known(day(2026, 2, 10))
        );
    }

    #[test]
    fn month_day_wraps_to_previous_year() {
        let today = day(2026, 1, 2);
        assert_eq!(
            normalize_date_at("12/30", today),
            PostedDate::Known(day(2025, 12, 30))
        );
        // inside the tolerance stays in the current year
        assert_eq!(
            normalize_date_at("1/4", today),
            PostedDate::Known(day(2026, 1, 4))
        );
    }

    #[test]
    fn garbage_and_epoch_are_sentinel() {
        let today = day(2026, 2, 14);
        for raw in ["", "   ", "unknown-old", "13/45", "posted recently", "1970-01-01"] {
            assert_eq!(normalize_date_at(raw, today), PostedDate::UnknownOld, "{raw:?}");
        }
    }

    #[test]
    fn clean_text_strips_markup() {
        assert_eq!(
            clean_text("<b>Edison&nbsp;Standard</b>\n  phonograph &ldquo;works&rdquo;"),
            r#"Edison Standard phonograph "works""#
        );
    }
}
