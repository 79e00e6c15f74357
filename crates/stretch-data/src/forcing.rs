//! Environmental forcing series (precipitation, pressure, temperature, ...).
//!
//! A forcing folder holds one `<station>.csv` per station with a date index
//! and a `Data` column, optionally followed by an `Error` column.

use std::path::Path;

use chrono::NaiveDateTime;
use stretch_core::config::MissingFilePolicy;
use stretch_core::stations::ALL_STATIONS;
use stretch_core::time_utils::day_of;
use stretch_core::{Result, StretchError};
use tracing::{debug, warn};

use crate::reader::{find_csv_files, read_date_csv};
use crate::table::{ColumnAlignment, DateFrame};

pub const DATA_COLUMN: &str = "Data";
pub const ERROR_COLUMN: &str = "Error";

// ── ForcingSeries ─────────────────────────────────────────────────────────────

/// Daily-averaged forcing values across the selected stations.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcingSeries {
    frame: DateFrame,
}

impl ForcingSeries {
    /// The `Data` column, missing days dropped.
    pub fn values(&self) -> Vec<(NaiveDateTime, f64)> {
        self.frame.column(DATA_COLUMN).unwrap_or_default()
    }

    /// The `Error` column, if the files carried one.
    pub fn errors(&self) -> Option<Vec<(NaiveDateTime, f64)>> {
        self.frame.column(ERROR_COLUMN)
    }

    /// Days in `[start, end]` only.
    pub fn clip(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            frame: self.frame.clip(start, end),
        }
    }

    /// Running sum of `Data`.
    pub fn cumulative(&self) -> Self {
        let mut frame = self.frame.clone();
        frame.cumulate_column(DATA_COLUMN);
        Self { frame }
    }

    pub fn max_value(&self) -> Option<f64> {
        self.values()
            .into_iter()
            .map(|(_, v)| v)
            .filter(|v| v.is_finite())
            .reduce(f64::max)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Station names (file stems) available in a forcing folder, sorted.
pub fn list_stations(folder: &Path) -> Result<Vec<String>> {
    Ok(find_csv_files(folder)?
        .iter()
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect())
}

/// Load the selected stations of a forcing folder and average them per day.
///
/// A station named `all` (any case) selects every file in the folder.
pub fn load_forcing<S: AsRef<str>>(
    folder: &Path,
    stations: &[S],
    missing: MissingFilePolicy,
) -> Result<ForcingSeries> {
    let select_all = stations.is_empty()
        || stations
            .iter()
            .any(|s| s.as_ref().eq_ignore_ascii_case(ALL_STATIONS));

    let files = if select_all {
        find_csv_files(folder)?
    } else {
        let mut files = Vec::with_capacity(stations.len());
        for station in stations {
            let station = station.as_ref();
            let path = folder.join(format!("{}.csv", station));
            if path.is_file() {
                files.push(path);
            } else if missing == MissingFilePolicy::Skip {
                warn!("Station {} not found in {}, skipping", station, folder.display());
            } else {
                return Err(StretchError::StationNotFound {
                    station: station.to_string(),
                    folder: folder.to_path_buf(),
                });
            }
        }
        files
    };

    let tables = files
        .iter()
        .map(|p| read_date_csv(p))
        .collect::<Result<Vec<_>>>()?;
    let frame = DateFrame::concat_mean(&tables, ColumnAlignment::Name, day_of)?;
    if frame.is_empty() {
        return Err(StretchError::EmptyResultSet(format!(
            "forcing folder {}",
            folder.display()
        )));
    }
    if !frame.columns().iter().any(|c| c == DATA_COLUMN) {
        return Err(StretchError::MissingColumn {
            path: folder.to_path_buf(),
            column: DATA_COLUMN.to_string(),
        });
    }

    debug!(
        "Loaded {} station files from {} into {} days",
        tables.len(),
        folder.display(),
        frame.len()
    );
    Ok(ForcingSeries { frame })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stretch_core::time_utils::parse_date;
    use tempfile::TempDir;

    fn d(s: &str) -> NaiveDateTime {
        parse_date(s).unwrap()
    }

    fn fixture(root: &Path) -> std::path::PathBuf {
        let folder = root.join("precipitation");
        fs::create_dir_all(&folder).unwrap();
        fs::write(
            folder.join("Daguan.csv"),
            "Date,Data,Error\n2020-01-01 06:00:00,2.0,0.1\n2020-01-01 18:00:00,4.0,0.3\n2020-01-02,1.0,0.2\n",
        )
        .unwrap();
        fs::write(
            folder.join("Wanrong.csv"),
            "Date,Data\n2020-01-01,6.0\n2020-01-03,5.0\n",
        )
        .unwrap();
        folder
    }

    #[test]
    fn test_single_station_daily_average() {
        let tmp = TempDir::new().unwrap();
        let folder = fixture(tmp.path());

        let series = load_forcing(&folder, &["Daguan"], MissingFilePolicy::Abort).unwrap();
        assert_eq!(
            series.values(),
            vec![(d("2020-01-01"), 3.0), (d("2020-01-02"), 1.0)]
        );
        let errors = series.errors().unwrap();
        assert!((errors[0].1 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_all_stations_averaged_by_column_name() {
        let tmp = TempDir::new().unwrap();
        let folder = fixture(tmp.path());

        let series = load_forcing(&folder, &["ALL"], MissingFilePolicy::Abort).unwrap();
        let values = series.values();
        // 2020-01-01: 2.0, 4.0 and 6.0
        assert_eq!(values[0], (d("2020-01-01"), 4.0));
        assert_eq!(values.len(), 3);
        assert_eq!(series.max_value(), Some(5.0));
    }

    #[test]
    fn test_missing_station() {
        let tmp = TempDir::new().unwrap();
        let folder = fixture(tmp.path());

        match load_forcing(&folder, &["Nowhere"], MissingFilePolicy::Abort) {
            Err(StretchError::StationNotFound { station, .. }) => assert_eq!(station, "Nowhere"),
            other => panic!("unexpected result: {other:?}"),
        }

        let series =
            load_forcing(&folder, &["Nowhere", "Wanrong"], MissingFilePolicy::Skip).unwrap();
        assert_eq!(series.values().len(), 2);
    }

    #[test]
    fn test_clip_and_cumulative() {
        let tmp = TempDir::new().unwrap();
        let folder = fixture(tmp.path());

        let series = load_forcing(&folder, &["all"], MissingFilePolicy::Abort).unwrap();
        let cum = series.clip(d("2020-01-02"), d("2020-01-03")).cumulative();
        assert_eq!(
            cum.values(),
            vec![(d("2020-01-02"), 1.0), (d("2020-01-03"), 6.0)]
        );
        assert_eq!(cum.max_value(), Some(6.0));
    }

    #[test]
    fn test_list_stations() {
        let tmp = TempDir::new().unwrap();
        let folder = fixture(tmp.path());
        assert_eq!(
            list_stations(&folder).unwrap(),
            vec!["Daguan".to_string(), "Wanrong".to_string()]
        );
    }

    #[test]
    fn test_file_without_data_column() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("odd");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("X.csv"), "Date,Value\n2020-01-01,1.0\n").unwrap();
        assert!(matches!(
            load_forcing(&folder, &["X"], MissingFilePolicy::Abort),
            Err(StretchError::MissingColumn { .. })
        ));
    }
}
