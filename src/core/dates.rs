//! Publication date normalization.
//!
//! Providers report dates in whatever shape their catalog holds:
//! `1955-01-01`, `January 1, 1955`, `1955`, `May 2003`. Layouts are tried
//! in this order:
//!
//! 1. canonical `YYYY-MM-DD`
//! 2. verbose `Month D, YYYY` (full or abbreviated month name)
//! 3. the resolution date
//!
//! Partial dates (year only, year and month) match neither layout and
//! fall through to the resolution date.

use chrono::NaiveDate;

/// Canonical storage layout
pub const CANONICAL_LAYOUT: &str = "%Y-%m-%d";

/// Verbose layout used by OpenLibrary and some Google volumes
pub const VERBOSE_LAYOUT: &str = "%B %d, %Y";

/// Parse a date string without falling back.
pub fn parse(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, CANONICAL_LAYOUT) {
        return Some(date);
    }

    let verbose = NaiveDate::parse_from_str(raw, VERBOSE_LAYOUT).ok()?;

    // Round-trip through the canonical layout so only complete dates survive
    NaiveDate::parse_from_str(&format(verbose), CANONICAL_LAYOUT).ok()
}

/// Parse a date string, using `today` when no layout matches. Never fails.
pub fn normalize(raw: &str, today: NaiveDate) -> NaiveDate {
    parse(raw).unwrap_or(today)
}

/// Render a date in the canonical layout
pub fn format(date: NaiveDate) -> String {
    date.format(CANONICAL_LAYOUT).to_string()
}
