//! Peak-ground-velocity event list.
//!
//! The list is a CSV with (at least) the columns `yy_jjul_hh_min`, `sta` and
//! `PGV`. Header names may carry stray whitespace.

use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use stretch_core::config::PgvConfig;
use stretch_core::pairs::NicePairs;
use stretch_core::time_utils::parse_julian_stamp;
use stretch_core::{Result, StretchError};
use tracing::debug;

const DATE_COLUMN: &str = "yy_jjul_hh_min";
const STATION_COLUMN: &str = "sta";
const PGV_COLUMN: &str = "PGV";

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+").expect("regex is valid"))
}

/// One recorded event at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct PgvEvent {
    pub date: NaiveDateTime,
    /// Station tag as written in the list, e.g. `St3`.
    pub station: String,
    pub pgv: f64,
}

/// `3` → `St3`, the tag used in the event list.
pub fn station_tag(number: u32) -> String {
    format!("St{}", number)
}

/// `3` → `G3`, the series label.
pub fn station_label(number: u32) -> String {
    format!("G{}", number)
}

/// Read the event list, sorted by date.
pub fn load_pgv(path: &Path) -> Result<Vec<PgvEvent>> {
    if !path.is_file() {
        return Err(StretchError::FileNotFound(path.to_path_buf()));
    }
    let csv_err = |source: csv::Error| StretchError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| StretchError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let date_idx = column(DATE_COLUMN)?;
    let sta_idx = column(STATION_COLUMN)?;
    let pgv_idx = column(PGV_COLUMN)?;

    let mut events = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let stamp = record.get(date_idx).unwrap_or_default();
        let date = parse_julian_stamp(stamp).ok_or_else(|| StretchError::InvalidDate {
            path: path.to_path_buf(),
            value: stamp.to_string(),
        })?;
        let raw_pgv = record.get(pgv_idx).unwrap_or_default();
        let pgv = raw_pgv
            .parse::<f64>()
            .map_err(|_| StretchError::InvalidValue {
                path: path.to_path_buf(),
                line,
                value: raw_pgv.to_string(),
            })?;
        events.push(PgvEvent {
            date,
            station: record.get(sta_idx).unwrap_or_default().to_string(),
            pgv,
        });
    }

    events.sort_by_key(|e| e.date);
    debug!("Loaded {} PGV events from {}", events.len(), path.display());
    Ok(events)
}

/// Station numbers to show for the selected pairs.
///
/// Averaging over all pairs shows every configured station; otherwise each
/// distinct digit run in the display names is a station number.
pub fn pgv_stations(pairs: &NicePairs, config: &PgvConfig) -> Vec<u32> {
    if pairs.is_all() {
        return config.stations.clone();
    }
    let mut stations: Vec<u32> = Vec::new();
    for name in &pairs.display {
        for m in digits_pattern().find_iter(name) {
            if let Ok(n) = m.as_str().parse::<u32>() {
                if !stations.contains(&n) {
                    stations.push(n);
                }
            }
        }
    }
    stations
}

/// Events recorded at station `number`.
pub fn station_events(events: &[PgvEvent], number: u32) -> Vec<(NaiveDateTime, f64)> {
    let tag = station_tag(number);
    events
        .iter()
        .filter(|e| e.station == tag)
        .map(|e| (e.date, e.pgv))
        .collect()
}
