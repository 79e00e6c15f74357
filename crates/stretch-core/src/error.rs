use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while resolving, loading and averaging stretching results.
#[derive(Error, Debug)]
pub enum StretchError {
    /// A requested CSV file (or result directory) does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A forcing station was requested but its CSV file is absent.
    #[error("Station file not found: {station} in {folder}")]
    StationNotFound { station: String, folder: PathBuf },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A date index cell did not match any recognised format.
    #[error("Invalid date '{value}' in {path}")]
    InvalidDate { path: PathBuf, value: String },

    /// A data cell could not be parsed as a number.
    #[error("Invalid value '{value}' on line {line} of {path}")]
    InvalidValue {
        path: PathBuf,
        line: u64,
        value: String,
    },

    /// A CSV file lacks a column the loader needs.
    #[error("Column {column} missing in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// A filter identifier could not be parsed.
    #[error("Malformed filter identifier: {0}")]
    MalformedFilterSpec(String),

    /// No filter definition matches the filter code.
    #[error("Unknown filter code: {0}")]
    UnknownFilterCode(String),

    /// A forcing short name is not present in the default-stations table.
    #[error("Unknown forcing: {0}")]
    UnknownForcing(String),

    /// Nothing was left to aggregate.
    #[error("No data found for {0}")]
    EmptyResultSet(String),

    /// A coefficient matrix does not match the configured stretching grid.
    #[error("Coefficient matrix has {found} columns, expected {expected}")]
    MatrixShape { expected: usize, found: usize },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the stretch crates.
pub type Result<T> = std::result::Result<T, StretchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = StretchError::FileRead {
            path: PathBuf::from("/some/STR/01/010_DAYS/ZZ/A_B.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("A_B.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_file_not_found() {
        let err = StretchError::FileNotFound(PathBuf::from("STR/01/010_DAYS/ZZ/X.csv"));
        assert_eq!(err.to_string(), "File not found: STR/01/010_DAYS/ZZ/X.csv");
    }

    #[test]
    fn test_error_display_station_not_found() {
        let err = StretchError::StationNotFound {
            station: "Daguan".to_string(),
            folder: PathBuf::from("precipitation"),
        };
        assert_eq!(
            err.to_string(),
            "Station file not found: Daguan in precipitation"
        );
    }

    #[test]
    fn test_error_display_malformed_filter() {
        let err = StretchError::MalformedFilterSpec("1_x_4".to_string());
        assert_eq!(err.to_string(), "Malformed filter identifier: 1_x_4");
    }

    #[test]
    fn test_error_display_unknown_filter_code() {
        let err = StretchError::UnknownFilterCode("07".to_string());
        assert_eq!(err.to_string(), "Unknown filter code: 07");
    }

    #[test]
    fn test_error_display_matrix_shape() {
        let err = StretchError::MatrixShape {
            expected: 101,
            found: 99,
        };
        assert_eq!(
            err.to_string(),
            "Coefficient matrix has 99 columns, expected 101"
        );
    }

    #[test]
    fn test_error_display_invalid_value() {
        let err = StretchError::InvalidValue {
            path: PathBuf::from("a.csv"),
            line: 3,
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value 'abc' on line 3 of a.csv");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StretchError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: StretchError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
