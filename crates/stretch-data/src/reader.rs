//! CSV discovery and loading for stretching results and forcings.
//!
//! Every file the tools read shares one layout: a header row, a date index
//! in the first column, and numeric value columns after it.

use std::path::{Path, PathBuf};

use stretch_core::time_utils::parse_date;
use stretch_core::{Result, StretchError};
use tracing::debug;

use crate::table::CsvTable;

// ── Public API ────────────────────────────────────────────────────────────────

/// Find the `.csv` files directly inside `dir`, sorted by path.
///
/// A missing directory is an error; an empty one yields an empty list.
/// An entry that cannot be read (a dangling link, a permission error) fails
/// the whole listing.
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(StretchError::FileNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
    {
        let entry = entry.map_err(|err| StretchError::FileRead {
            path: err.path().unwrap_or(dir).to_path_buf(),
            source: err.into(),
        })?;
        let is_csv = entry
            .path()
            .extension()
            .map(|ext| ext == "csv")
            .unwrap_or(false);
        if entry.file_type().is_file() && is_csv {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Read one date-indexed CSV file.
///
/// Empty cells become `NaN`. Blank lines are skipped. The date column must
/// parse with [`parse_date`]; every other cell must be a number.
pub fn read_date_csv(path: &Path) -> Result<CsvTable> {
    if !path.is_file() {
        return Err(StretchError::FileNotFound(path.to_path_buf()));
    }

    let csv_err = |source: csv::Error| StretchError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let date_cell = record.get(0).unwrap_or_default();
        let date = parse_date(date_cell).ok_or_else(|| StretchError::InvalidDate {
            path: path.to_path_buf(),
            value: date_cell.to_string(),
        })?;

        let values = record
            .iter()
            .skip(1)
            .map(|cell| parse_cell(cell, path, line))
            .collect::<Result<Vec<f64>>>()?;
        rows.push((date, values));
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(CsvTable {
        path: path.to_path_buf(),
        columns,
        rows,
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn parse_cell(cell: &str, path: &Path, line: u64) -> Result<f64> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| StretchError::InvalidValue {
        path: path.to_path_buf(),
        line,
        value: cell.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_find_csv_files_sorted_and_flat() {
        let tmp = TempDir::new().unwrap();
        write_csv(tmp.path(), "b.csv", "Date,dvv\n");
        write_csv(tmp.path(), "a.csv", "Date,dvv\n");
        write_csv(tmp.path(), "notes.txt", "x");
        fs::create_dir(tmp.path().join("sub")).unwrap();
        write_csv(&tmp.path().join("sub"), "c.csv", "Date,dvv\n");

        let files = find_csv_files(tmp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn test_find_csv_files_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            find_csv_files(&missing),
            Err(StretchError::FileNotFound(p)) if p == missing
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_csv_files_unreadable_entry_is_error() {
        let tmp = TempDir::new().unwrap();
        write_csv(tmp.path(), "a.csv", "Date,dvv\n");
        let link = tmp.path().join("b.csv");
        std::os::unix::fs::symlink(tmp.path().join("gone.csv"), &link).unwrap();

        assert!(matches!(
            find_csv_files(tmp.path()),
            Err(StretchError::FileRead { path, .. }) if path == link
        ));
    }

    #[test]
    fn test_find_csv_files_empty_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(find_csv_files(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_read_date_csv_basic() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(
            tmp.path(),
            "A_B_C.csv",
            "Date,dvv,cc\n2020-01-02,1.01,0.8\n2020-01-01 12:00:00,0.99,\n\n",
        );

        let table = read_date_csv(&path).unwrap();
        assert_eq!(table.columns, vec!["dvv".to_string(), "cc".to_string()]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].1, vec![1.01, 0.8]);
        assert_eq!(table.rows[1].0, parse_date("2020-01-01 12:00:00").unwrap());
        assert!(table.rows[1].1[1].is_nan());
    }

    #[test]
    fn test_read_date_csv_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            read_date_csv(&tmp.path().join("x.csv")),
            Err(StretchError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_read_date_csv_invalid_date() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(tmp.path(), "x.csv", "Date,dvv\nyesterday,1.0\n");
        assert!(matches!(
            read_date_csv(&path),
            Err(StretchError::InvalidDate { value, .. }) if value == "yesterday"
        ));
    }

    #[test]
    fn test_read_date_csv_invalid_value() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(tmp.path(), "x.csv", "Date,dvv\n2020-01-01,1.0\n2020-01-02,abc\n");
        assert!(matches!(
            read_date_csv(&path),
            Err(StretchError::InvalidValue { line: 3, value, .. }) if value == "abc"
        ));
    }

    #[test]
    fn test_read_date_csv_ragged_row_is_csv_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(tmp.path(), "x.csv", "Date,dvv\n2020-01-01,1.0,2.0\n");
        assert!(matches!(
            read_date_csv(&path),
            Err(StretchError::Csv { .. })
        ));
    }
}
