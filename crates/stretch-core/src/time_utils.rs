use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

// ── Date index parsing ────────────────────────────────────────────────────────

/// Naive date-time patterns accepted in the first (index) column of result
/// and forcing CSV files.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Date-only patterns.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Parse a date index cell into a naive timestamp.
///
/// Handles plain dates (midnight), naive date-times and offset-carrying
/// RFC 3339 strings (converted to UTC and stripped of the offset).
/// Returns `None` for empty strings or unrecognised formats.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    let normalised = match s.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_utc());
    }

    debug!("parse_date: unrecognised date \"{}\"", s);
    None
}

/// Parse a PGV event stamp `yy_jjj_hh_mm` (two-digit year, day of year,
/// hour, minute).
pub fn parse_julian_stamp(s: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = s.trim().split('_').collect();
    if parts.len() != 4 {
        return None;
    }
    let joined = parts.join("-");
    NaiveDateTime::parse_from_str(&joined, "%y-%j-%H-%M").ok()
}

/// Truncate a timestamp to midnight of its calendar day.
pub fn day_of(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_time(NaiveTime::MIN)
}

/// Render a timestamp for reports: date only when it falls on midnight.
pub fn format_date(dt: NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M").to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
