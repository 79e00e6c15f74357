//! Project configuration read once at startup.
//!
//! Holds the values the averaging pipeline needs from the processing
//! project: the stretching grid, the default lag window, the default
//! moving-stack list and the filter band definitions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StretchError};

/// File name of the project config inside the project directory.
pub const CONFIG_FILE_NAME: &str = "ms_stretch.json";

// ── FilterDef ─────────────────────────────────────────────────────────────────

/// Frequency band of one upstream filter, keyed by its reference number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDef {
    #[serde(rename = "ref")]
    pub ref_number: u32,
    /// Lower corner frequency in Hz.
    pub low: f64,
    /// Upper corner frequency in Hz.
    pub high: f64,
}

// ── PgvConfig ─────────────────────────────────────────────────────────────────

/// Location of the peak-ground-velocity event list and its station numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgvConfig {
    /// Event list path, relative to the project directory.
    pub file: PathBuf,
    /// Station numbers shown when averaging over all pairs.
    pub stations: Vec<u32>,
}

impl Default for PgvConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("PGV_data").join("WANRONG_EQ_INFO_LIST_PGV.txt"),
            stations: (1..=7).collect(),
        }
    }
}

// ── ProjectConfig ─────────────────────────────────────────────────────────────

/// Project-wide settings consumed by the resolver and the loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Maximum stretching ratio deviation searched upstream.
    pub stretching_max: f64,
    /// Number of stretching steps (coefficient matrix width).
    pub stretching_nsteps: usize,
    /// Default start of the lag window in seconds.
    pub dtt_minlag: f64,
    /// Default width of the lag window in seconds.
    pub dtt_width: f64,
    /// Comma-separated moving-stack windows in days.
    pub mov_stack: String,
    /// Known filter bands.
    pub filters: Vec<FilterDef>,
    pub pgv: PgvConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            stretching_max: 0.01,
            stretching_nsteps: 1000,
            dtt_minlag: 5.0,
            dtt_width: 30.0,
            mov_stack: "5".to_string(),
            filters: Vec::new(),
            pgv: PgvConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Return the config path inside `project_dir`.
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE_NAME)
    }

    /// Load the config from `path`.
    ///
    /// A missing file yields the defaults; unreadable, malformed or invalid
    /// content is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| StretchError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.stretching_max > 0.0) {
            return Err(StretchError::Config(format!(
                "stretching_max must be positive, got {}",
                self.stretching_max
            )));
        }
        if self.stretching_nsteps == 0 {
            return Err(StretchError::Config(
                "stretching_nsteps must be at least 1".to_string(),
            ));
        }
        if !(self.dtt_width > 0.0) {
            return Err(StretchError::Config(format!(
                "dtt_width must be positive, got {}",
                self.dtt_width
            )));
        }
        self.mov_stacks()?;
        Ok(())
    }

    /// Parse `mov_stack` into a list of window sizes.
    pub fn mov_stacks(&self) -> Result<Vec<u32>> {
        self.mov_stack
            .split(',')
            .map(|s| {
                let s = s.trim();
                match s.parse::<u32>() {
                    Ok(days) if days > 0 => Ok(days),
                    _ => Err(StretchError::Config(format!(
                        "invalid mov_stack entry '{}'",
                        s
                    ))),
                }
            })
            .collect()
    }

    /// Stretching parameters for the coefficient-matrix loader.
    pub fn stretching(&self) -> StretchingParams {
        StretchingParams {
            max_stretch: self.stretching_max,
            n_steps: self.stretching_nsteps,
        }
    }

    /// Default lag window `(minlag, endlag)` in seconds.
    pub fn default_lag_window(&self) -> (f64, f64) {
        (self.dtt_minlag, self.dtt_minlag + self.dtt_width)
    }
}

/// What a loader does when a requested pair or station file is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFilePolicy {
    /// Fail with a not-found error naming the file.
    #[default]
    Abort,
    /// Log a warning and leave the file out of the average.
    Skip,
}

/// The stretching grid definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchingParams {
    pub max_stretch: f64,
    pub n_steps: usize,
}

impl StretchingParams {
    /// Ratio steps `1 + linspace(-max_stretch, max_stretch, n_steps)`.
    pub fn grid(&self) -> Vec<f64> {
        crate::stats::stretch_grid(self.max_stretch, self.n_steps)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
