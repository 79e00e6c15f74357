//! Cross-pair averaging of stretching results.
//!
//! [`get_dvv`] and [`get_corr`] outer-join one column of every selected pair
//! file on date and reduce each row to its mean and median. [`get_dvv_mat`]
//! averages whole coefficient matrices and picks the best stretching step per
//! date.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use stretch_core::config::{MissingFilePolicy, StretchingParams};
use stretch_core::filters::normalize_filter_key;
use stretch_core::pairs::PairSelector;
use stretch_core::stats::{nan_argmax, nan_mean, nan_median, ratio_to_percent};
use stretch_core::{Result, StretchError};
use tracing::{debug, info, warn};

use crate::reader::{find_csv_files, read_date_csv};
use crate::store::{ResultKind, ResultStore};
use crate::table::{ColumnAlignment, DateFrame};

/// Column of the per-pair series files holding the stretching ratio.
const RATIO_COLUMN: usize = 0;
/// Column of the per-pair series files holding the correlation coefficient.
const COEFF_COLUMN: usize = 1;

// ── Query ─────────────────────────────────────────────────────────────────────

/// Selection of pair files for one aggregated series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    /// Moving-stack window in days.
    pub mov_stack: u32,
    pub components: Vec<String>,
    /// Filter directory key, raw (`1_2_4`) or already normalised (`01_2_4`).
    pub filter: String,
    pub pairs: PairSelector,
    pub missing: MissingFilePolicy,
}

impl SeriesQuery {
    pub fn new(
        mov_stack: u32,
        components: Vec<String>,
        filter: impl Into<String>,
        pairs: PairSelector,
    ) -> Self {
        Self {
            mov_stack,
            components,
            filter: filter.into(),
            pairs,
            missing: MissingFilePolicy::default(),
        }
    }

    pub fn with_missing(mut self, missing: MissingFilePolicy) -> Self {
        self.missing = missing;
        self
    }

    fn describe(&self, kind: ResultKind) -> String {
        format!(
            "{} filter {} window {} components {} pairs {}",
            kind,
            self.filter,
            self.mov_stack,
            self.components.join(","),
            self.pairs
        )
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// One date of an aggregated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDateTime,
    pub mean: f64,
    pub median: f64,
}

/// Per-date mean and median across the selected pairs, ascending by date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeanMedianSeries {
    pub points: Vec<SeriesPoint>,
}

impl MeanMedianSeries {
    /// Reduce every row of `frame`, mapping both statistics through
    /// `transform`. Rows without a finite value are dropped.
    fn from_frame(frame: &DateFrame, transform: impl Fn(f64) -> f64) -> Self {
        let points = frame
            .rows()
            .filter_map(|(date, values)| {
                let mean = nan_mean(values)?;
                let median = nan_median(values)?;
                Some(SeriesPoint {
                    date: *date,
                    mean: transform(mean),
                    median: transform(median),
                })
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn means(&self) -> Vec<(NaiveDateTime, f64)> {
        self.points.iter().map(|p| (p.date, p.mean)).collect()
    }

    pub fn medians(&self) -> Vec<(NaiveDateTime, f64)> {
        self.points.iter().map(|p| (p.date, p.median)).collect()
    }
}

/// Result of [`get_dvv_mat`].
#[derive(Debug, Clone, PartialEq)]
pub struct DvvMatrix {
    /// Best stretching ratio per date (a grid value, not a percentage).
    pub dvv: Vec<(NaiveDateTime, f64)>,
    /// Averaged coefficient matrix, one column per stretching step.
    pub coefficients: DateFrame,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Mean and median dv/v in percent, `(ratio - 1) * 100`.
pub fn get_dvv(store: &ResultStore, query: &SeriesQuery) -> Result<MeanMedianSeries> {
    let frame = join_column(store, query, RATIO_COLUMN)?;
    Ok(MeanMedianSeries::from_frame(&frame, ratio_to_percent))
}

/// Mean and median correlation coefficient, untransformed.
pub fn get_corr(store: &ResultStore, query: &SeriesQuery) -> Result<MeanMedianSeries> {
    let frame = join_column(store, query, COEFF_COLUMN)?;
    Ok(MeanMedianSeries::from_frame(&frame, |x| x))
}

/// Average the coefficient matrices of the selected pairs and take, per date,
/// the stretching step with the highest mean coefficient.
pub fn get_dvv_mat(
    store: &ResultStore,
    query: &SeriesQuery,
    stretching: StretchingParams,
) -> Result<DvvMatrix> {
    let files = collect_files(store, ResultKind::Matrix, query)?;
    let tables = files
        .iter()
        .map(|path| read_date_csv(path))
        .collect::<Result<Vec<_>>>()?;

    let coefficients = DateFrame::concat_mean(&tables, ColumnAlignment::Position, |d| d)?;
    if coefficients.is_empty() {
        return Err(StretchError::EmptyResultSet(query.describe(ResultKind::Matrix)));
    }
    if coefficients.columns().len() != stretching.n_steps {
        return Err(StretchError::MatrixShape {
            expected: stretching.n_steps,
            found: coefficients.columns().len(),
        });
    }

    let grid = stretching.grid();
    let mut dvv = Vec::with_capacity(coefficients.len());
    for (date, row) in coefficients.rows() {
        match nan_argmax(row) {
            Some(idx) => dvv.push((*date, grid[idx])),
            None => debug!("No finite coefficient on {}, date dropped", date),
        }
    }

    info!(
        "Averaged {} coefficient matrices into {} dates",
        tables.len(),
        dvv.len()
    );
    Ok(DvvMatrix { dvv, coefficients })
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Outer-join column `index` of every selected series file on date.
fn join_column(store: &ResultStore, query: &SeriesQuery, index: usize) -> Result<DateFrame> {
    let files = collect_files(store, ResultKind::Series, query)?;

    let mut series = Vec::with_capacity(files.len());
    for path in &files {
        let table = read_date_csv(path)?;
        series.push((series_name(path), table.column_at(index)?));
    }

    let frame = DateFrame::outer_join(series);
    if frame.is_empty() {
        return Err(StretchError::EmptyResultSet(query.describe(ResultKind::Series)));
    }
    info!("Joined {} pair files over {} dates", files.len(), frame.len());
    Ok(frame)
}

/// `<component>/<pair>` from `.../<component>/<pair>.csv`.
fn series_name(path: &std::path::Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.parent().and_then(|p| p.file_name()) {
        Some(comp) => format!("{}/{}", comp.to_string_lossy(), stem),
        None => stem,
    }
}

/// Resolve the selected pair files under every component directory.
fn collect_files(
    store: &ResultStore,
    kind: ResultKind,
    query: &SeriesQuery,
) -> Result<Vec<PathBuf>> {
    let filter_key = normalize_filter_key(&query.filter)?;
    let mut files = Vec::new();

    for component in &query.components {
        let dir = store.component_dir(kind, &filter_key, query.mov_stack, component);
        match &query.pairs {
            PairSelector::All => match find_csv_files(&dir) {
                Ok(found) => files.extend(found),
                Err(StretchError::FileNotFound(path))
                    if query.missing == MissingFilePolicy::Skip =>
                {
                    warn!("Result directory {} not found, skipping", path.display());
                }
                Err(e) => return Err(e),
            },
            PairSelector::Pairs(pairs) => {
                for pair in pairs {
                    let path =
                        store.pair_file(kind, &filter_key, query.mov_stack, component, pair);
                    if path.is_file() {
                        files.push(path);
                    } else if query.missing == MissingFilePolicy::Skip {
                        warn!("Pair file {} not found, skipping", path.display());
                    } else {
                        return Err(StretchError::FileNotFound(path));
                    }
                }
            }
        }
    }

    if files.is_empty() {
        return Err(StretchError::EmptyResultSet(query.describe(kind)));
    }
    debug!("Selected {} {} files", files.len(), kind);
    Ok(files)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
