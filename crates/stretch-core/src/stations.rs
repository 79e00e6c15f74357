//! Default-stations table: per-forcing display metadata and default station.
//!
//! The table lives in `default_stations.json` inside the project directory and
//! is created by `install` and dropped by `uninstall`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StretchError};

/// File name of the table inside the project directory.
pub const TABLE_FILE_NAME: &str = "default_stations.json";

/// Station value meaning "every station in the forcing folder".
pub const ALL_STATIONS: &str = "all";

// ── PlotStyle ─────────────────────────────────────────────────────────────────

/// How a forcing series is drawn next to the dv/v curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotStyle {
    #[default]
    Points,
    Bars,
    /// Bars of the running sum.
    Cumsum,
    /// Points with the `Error` column as error bars.
    Errorbars,
}

impl PlotStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotStyle::Points => "points",
            PlotStyle::Bars => "bars",
            PlotStyle::Cumsum => "cumsum",
            PlotStyle::Errorbars => "errorbars",
        }
    }

    /// Parse a stored style name, falling back to [`PlotStyle::Points`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            warn!("Unknown plot type '{}', using points", s);
            PlotStyle::Points
        })
    }
}

impl FromStr for PlotStyle {
    type Err = StretchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "points" => Ok(PlotStyle::Points),
            "bars" => Ok(PlotStyle::Bars),
            "cumsum" | "cumsum bars" => Ok(PlotStyle::Cumsum),
            "errorbars" => Ok(PlotStyle::Errorbars),
            other => Err(StretchError::Config(format!("unknown plot type '{}'", other))),
        }
    }
}

impl fmt::Display for PlotStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ForcingDefaults ───────────────────────────────────────────────────────────

/// One row of the default-stations table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcingDefaults {
    /// 1-based reference number.
    #[serde(rename = "ref")]
    pub ref_number: u32,
    /// Short name used on the command line, e.g. `prec`.
    pub short_name: String,
    /// Display name, e.g. `Precipitation`.
    pub forcing: String,
    /// Folder holding one CSV per station, relative to the project.
    pub folder_name: String,
    /// Station used unless the user picks one; may be `all`.
    pub default_station: String,
    /// Unit used in labels; may be empty.
    #[serde(default)]
    pub unit: String,
    /// Stored plot type name.
    pub plot_type: String,
}

impl ForcingDefaults {
    fn new(
        ref_number: u32,
        short_name: &str,
        forcing: &str,
        folder_name: &str,
        default_station: &str,
        unit: &str,
        plot_type: &str,
    ) -> Self {
        Self {
            ref_number,
            short_name: short_name.to_string(),
            forcing: forcing.to_string(),
            folder_name: folder_name.to_string(),
            default_station: default_station.to_string(),
            unit: unit.to_string(),
            plot_type: plot_type.to_string(),
        }
    }

    pub fn plot_style(&self) -> PlotStyle {
        PlotStyle::parse_lenient(&self.plot_type)
    }

    /// Axis label: display name, prefixed for cumulative plots, with unit.
    pub fn label(&self) -> String {
        let name = match self.plot_style() {
            PlotStyle::Cumsum => format!("Cumulative {}", self.forcing.to_lowercase()),
            _ => self.forcing.clone(),
        };
        if self.unit.is_empty() {
            name
        } else {
            format!("{} in {}", name, self.unit)
        }
    }
}

// ── DefaultStations ───────────────────────────────────────────────────────────

/// The ordered table of forcing defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefaultStations {
    pub rows: Vec<ForcingDefaults>,
}

impl DefaultStations {
    /// Built-in rows written by `install`.
    pub fn builtin() -> Self {
        Self {
            rows: vec![
                ForcingDefaults::new(1, "prec", "Precipitation", "precipitation", "Daguan", "mm", "bars"),
                ForcingDefaults::new(2, "press", "Pressure", "pressure", "all", "kPa", "points"),
                ForcingDefaults::new(3, "temp", "Temperature", "temperature", "all", "°C", "points"),
                ForcingDefaults::new(4, "ndvi", "NDVI", "ndvi", "landmask", "", "errorbars"),
                ForcingDefaults::new(5, "depth", "Sensor Depth", "sensor_depth", "TWL8", "m", "points"),
            ],
        }
    }

    /// Return the table path inside `project_dir`.
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(TABLE_FILE_NAME)
    }

    /// Load the table; a missing file means the table was never installed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StretchError::Config(format!(
                "default stations table {} not found, run `ms-stretch install`",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|source| StretchError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Create the table with the built-in rows unless it already exists.
    ///
    /// Returns `true` when a new table was written.
    pub fn install(path: &Path) -> Result<bool> {
        if path.exists() {
            warn!("Table {} seems to already exist", path.display());
            return Ok(false);
        }
        let table = Self::builtin();
        let json = serde_json::to_string_pretty(&table)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        info!("Installed {} forcing defaults in {}", table.rows.len(), path.display());
        Ok(true)
    }

    /// Drop the table. Returns `true` when a file was removed.
    pub fn uninstall(path: &Path) -> Result<bool> {
        if !path.exists() {
            warn!("Table {} does not exist", path.display());
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        info!("Removed {}", path.display());
        Ok(true)
    }

    /// Look up a row by short name.
    pub fn get(&self, short_name: &str) -> Result<&ForcingDefaults> {
        self.rows
            .iter()
            .find(|r| r.short_name == short_name)
            .ok_or_else(|| StretchError::UnknownForcing(short_name.to_string()))
    }

    /// Look up a row by reference number.
    pub fn get_by_ref(&self, ref_number: u32) -> Option<&ForcingDefaults> {
        self.rows.iter().find(|r| r.ref_number == ref_number)
    }

    /// The forcing used when none is requested (`ref == 1`).
    pub fn default_forcing(&self) -> Result<&ForcingDefaults> {
        self.get_by_ref(1)
            .or_else(|| self.rows.first())
            .ok_or_else(|| StretchError::UnknownForcing("<default>".to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_then_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = DefaultStations::path_in(tmp.path());

        assert!(DefaultStations::install(&path).unwrap());
        let table = DefaultStations::load_from(&path).unwrap();
        assert_eq!(table, DefaultStations::builtin());

        let prec = table.get("prec").unwrap();
        assert_eq!(prec.folder_name, "precipitation");
        assert_eq!(prec.default_station, "Daguan");
        assert_eq!(prec.plot_style(), PlotStyle::Bars);
    }

    #[test]
    fn test_install_is_idempotent() {
        let tmp = TempDir::new().expect("tempdir");
        let path = DefaultStations::path_in(tmp.path());

        let mut custom = DefaultStations::builtin();
        custom.rows.truncate(1);
        std::fs::write(&path, serde_json::to_string(&custom).unwrap()).unwrap();

        assert!(!DefaultStations::install(&path).unwrap());
        let table = DefaultStations::load_from(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_uninstall() {
        let tmp = TempDir::new().expect("tempdir");
        let path = DefaultStations::path_in(tmp.path());
        DefaultStations::install(&path).unwrap();

        assert!(DefaultStations::uninstall(&path).unwrap());
        assert!(!path.exists());
        assert!(!DefaultStations::uninstall(&path).unwrap());
        assert!(matches!(
            DefaultStations::load_from(&path),
            Err(StretchError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_forcing() {
        let table = DefaultStations::builtin();
        assert!(matches!(
            table.get("wind"),
            Err(StretchError::UnknownForcing(name)) if name == "wind"
        ));
    }

    #[test]
    fn test_default_forcing_is_ref_one() {
        let table = DefaultStations::builtin();
        assert_eq!(table.default_forcing().unwrap().short_name, "prec");
        assert!(DefaultStations::default().default_forcing().is_err());
    }

    #[test]
    fn test_plot_style_parsing() {
        assert_eq!("cumsum".parse::<PlotStyle>().unwrap(), PlotStyle::Cumsum);
        assert_eq!("ErrorBars".parse::<PlotStyle>().unwrap(), PlotStyle::Errorbars);
        assert!("spline".parse::<PlotStyle>().is_err());
        assert_eq!(PlotStyle::parse_lenient("spline"), PlotStyle::Points);
    }

    #[test]
    fn test_labels() {
        let table = DefaultStations::builtin();
        assert_eq!(table.get("prec").unwrap().label(), "Precipitation in mm");
        assert_eq!(table.get("ndvi").unwrap().label(), "NDVI");

        let mut cum = table.get("prec").unwrap().clone();
        cum.plot_type = "cumsum".to_string();
        assert_eq!(cum.label(), "Cumulative precipitation in mm");
    }
}
