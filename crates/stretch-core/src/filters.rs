//! Filter identifier resolution.
//!
//! A filter identifier is either a bare filter number (`"1"`, `"01"`) or a
//! number with an embedded lag window (`"1_2.5_10"`).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{FilterDef, ProjectConfig};
use crate::error::{Result, StretchError};

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{1,2}$").expect("regex is valid"))
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// A fully resolved filter: code, band and lag window.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// Two-digit filter code, e.g. `"01"`.
    pub code: String,
    /// Directory name of the filter inside the result store.
    pub dir_key: String,
    /// Filter reference number (integer value of `code`).
    pub ref_number: u32,
    pub low_hz: f64,
    pub high_hz: f64,
    pub min_lag_s: f64,
    pub end_lag_s: f64,
}

impl FilterSpec {
    /// Legend-style label, e.g. `Filter 1, 2-4s`.
    pub fn short_label(&self) -> String {
        format!(
            "Filter {}, {}-{}s",
            self.ref_number, self.min_lag_s, self.end_lag_s
        )
    }

    /// Title line describing band and lag window.
    pub fn description(&self) -> String {
        format!(
            "Filter {} ({:.2} - {:.2} Hz), Lag time window {:.1} - {:.1}s",
            self.ref_number, self.low_hz, self.high_hz, self.min_lag_s, self.end_lag_s
        )
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_key)
    }
}

// ── FilterRegistry ────────────────────────────────────────────────────────────

/// Read-only view over the known filter bands.
pub struct FilterRegistry<'a> {
    filters: &'a [FilterDef],
}

impl<'a> FilterRegistry<'a> {
    pub fn new(filters: &'a [FilterDef]) -> Self {
        Self { filters }
    }

    /// Band of the filter with reference number `ref_number`, if known.
    pub fn lookup(&self, ref_number: u32) -> Option<&'a FilterDef> {
        self.filters.iter().find(|f| f.ref_number == ref_number)
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Zero-pad the code part of a raw identifier, keeping any lag suffix.
///
/// `"1"` → `"01"`, `"12"` → `"12"`, `"1_2_4"` → `"01_2_4"`.
pub fn normalize_filter_key(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let (code, rest) = match raw.find('_') {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, ""),
    };
    Ok(format!("{}{}", pad_code(code, raw)?, rest))
}

fn pad_code(code: &str, raw: &str) -> Result<String> {
    if !code_pattern().is_match(code) {
        return Err(StretchError::MalformedFilterSpec(raw.to_string()));
    }
    Ok(format!("{:0>2}", code))
}

/// Extract `(minlag, endlag)` embedded in the identifier, if any.
fn embedded_lag_window(raw: &str) -> Result<Option<(f64, f64)>> {
    let (Some(first), Some(last)) = (raw.find('_'), raw.rfind('_')) else {
        return Ok(None);
    };
    if first == last {
        return Err(StretchError::MalformedFilterSpec(raw.to_string()));
    }
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| StretchError::MalformedFilterSpec(raw.to_string()))
    };
    let minlag = parse(&raw[first + 1..last])?;
    let endlag = parse(&raw[last + 1..])?;
    Ok(Some((minlag, endlag)))
}

/// Resolve one identifier against the project config.
pub fn resolve_filter(raw: &str, config: &ProjectConfig) -> Result<FilterSpec> {
    let raw = raw.trim();
    let dir_key = normalize_filter_key(raw)?;
    let code = dir_key[..2].to_string();

    let (min_lag_s, end_lag_s) = match embedded_lag_window(raw)? {
        Some(window) => window,
        None => config.default_lag_window(),
    };
    if min_lag_s >= end_lag_s {
        return Err(StretchError::MalformedFilterSpec(raw.to_string()));
    }

    let ref_number: u32 = code
        .parse()
        .map_err(|_| StretchError::MalformedFilterSpec(raw.to_string()))?;
    let band = FilterRegistry::new(&config.filters)
        .lookup(ref_number)
        .ok_or_else(|| StretchError::UnknownFilterCode(code.clone()))?;

    Ok(FilterSpec {
        code,
        dir_key,
        ref_number,
        low_hz: band.low,
        high_hz: band.high,
        min_lag_s,
        end_lag_s,
    })
}

/// Resolve a batch of identifiers; the first failure aborts the batch.
pub fn resolve_filters<S: AsRef<str>>(
    filter_ids: &[S],
    config: &ProjectConfig,
) -> Result<Vec<FilterSpec>> {
    filter_ids
        .iter()
        .map(|id| resolve_filter(id.as_ref(), config))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
