//! Date-indexed tables and the joins/reductions the averagers need.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;

use stretch_core::{Result, StretchError};

// ── CsvTable ──────────────────────────────────────────────────────────────────

/// One CSV file as read from disk: date index plus numeric columns.
///
/// Rows keep file order and may repeat dates. Empty cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub path: PathBuf,
    /// Column names, excluding the index column.
    pub columns: Vec<String>,
    pub rows: Vec<(NaiveDateTime, Vec<f64>)>,
}

impl CsvTable {
    /// Number of value columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// The `(date, value)` pairs of the column at `index`.
    pub fn column_at(&self, index: usize) -> Result<Vec<(NaiveDateTime, f64)>> {
        if index >= self.width() {
            return Err(StretchError::MissingColumn {
                path: self.path.clone(),
                column: format!("#{}", index),
            });
        }
        Ok(self.rows.iter().map(|(d, v)| (*d, v[index])).collect())
    }
}

// ── MeanAccumulator ───────────────────────────────────────────────────────────

/// Per-date, per-column running sums that skip `NaN`.
struct MeanAccumulator {
    width: usize,
    cells: BTreeMap<NaiveDateTime, Vec<(f64, usize)>>,
}

impl MeanAccumulator {
    fn new(width: usize) -> Self {
        Self {
            width,
            cells: BTreeMap::new(),
        }
    }

    fn add(&mut self, date: NaiveDateTime, column: usize, value: f64) {
        let width = self.width;
        let row = self
            .cells
            .entry(date)
            .or_insert_with(|| vec![(0.0, 0); width]);
        if !value.is_nan() {
            row[column].0 += value;
            row[column].1 += 1;
        }
    }

    fn finish(self) -> BTreeMap<NaiveDateTime, Vec<f64>> {
        self.cells
            .into_iter()
            .map(|(date, row)| {
                let means = row
                    .into_iter()
                    .map(|(sum, n)| if n == 0 { f64::NAN } else { sum / n as f64 })
                    .collect();
                (date, means)
            })
            .collect()
    }
}

// ── DateFrame ─────────────────────────────────────────────────────────────────

/// How [`DateFrame::concat_mean`] lines up the columns of several files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAlignment {
    /// By position; every file must have the same width.
    Position,
    /// By header name; the result holds the union of names in first-seen order.
    Name,
}

/// A date-sorted table with one value per column and date (`NaN` = missing).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateFrame {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDateTime, Vec<f64>>,
}

impl DateFrame {
    /// Outer-join named series on date. Duplicate dates inside one series are
    /// averaged; dates absent from a series are `NaN` in its column.
    pub fn outer_join(series: Vec<(String, Vec<(NaiveDateTime, f64)>)>) -> Self {
        let mut acc = MeanAccumulator::new(series.len());
        let mut columns = Vec::with_capacity(series.len());
        for (col, (name, points)) in series.into_iter().enumerate() {
            for (date, value) in points {
                acc.add(date, col, value);
            }
            columns.push(name);
        }
        Self {
            columns,
            rows: acc.finish(),
        }
    }

    /// Concatenate the rows of all tables and average them per bucketed date.
    ///
    /// `bucket` maps each row date to its group key (identity or calendar
    /// day).
    pub fn concat_mean(
        tables: &[CsvTable],
        alignment: ColumnAlignment,
        bucket: impl Fn(NaiveDateTime) -> NaiveDateTime,
    ) -> Result<Self> {
        let Some(first) = tables.first() else {
            return Ok(Self::default());
        };

        let (columns, mappings) = match alignment {
            ColumnAlignment::Position => {
                let width = first.width();
                if let Some(bad) = tables.iter().find(|t| t.width() != width) {
                    return Err(StretchError::MatrixShape {
                        expected: width,
                        found: bad.width(),
                    });
                }
                let identity: Vec<usize> = (0..width).collect();
                (first.columns.clone(), vec![identity; tables.len()])
            }
            ColumnAlignment::Name => {
                let mut columns: Vec<String> = Vec::new();
                let mut mappings = Vec::with_capacity(tables.len());
                for table in tables {
                    let mapping = table
                        .columns
                        .iter()
                        .map(|name| match columns.iter().position(|c| c == name) {
                            Some(idx) => idx,
                            None => {
                                columns.push(name.clone());
                                columns.len() - 1
                            }
                        })
                        .collect::<Vec<_>>();
                    mappings.push(mapping);
                }
                (columns, mappings)
            }
        };

        let mut acc = MeanAccumulator::new(columns.len());
        for (table, mapping) in tables.iter().zip(&mappings) {
            for (date, values) in &table.rows {
                let key = bucket(*date);
                for (value, &col) in values.iter().zip(mapping) {
                    acc.add(key, col, *value);
                }
            }
        }

        Ok(Self {
            columns,
            rows: acc.finish(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in ascending date order.
    pub fn rows(&self) -> impl Iterator<Item = (&NaiveDateTime, &[f64])> {
        self.rows.iter().map(|(d, v)| (d, v.as_slice()))
    }

    /// The `(date, value)` pairs of a named column, `NaN` cells dropped.
    pub fn column(&self, name: &str) -> Option<Vec<(NaiveDateTime, f64)>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .filter(|(_, v)| !v[idx].is_nan())
                .map(|(d, v)| (*d, v[idx]))
                .collect(),
        )
    }

    /// Rows whose date lies in `[start, end]`.
    pub fn clip(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .range(start..=end)
                .map(|(d, v)| (*d, v.clone()))
                .collect(),
        }
    }

    /// Replace a named column with its running sum (`NaN` cells stay `NaN`
    /// and do not reset the sum).
    pub fn cumulate_column(&mut self, name: &str) {
        let Some(idx) = self.columns.iter().position(|c| c == name) else {
            return;
        };
        let mut total = 0.0;
        for values in self.rows.values_mut() {
            if !values[idx].is_nan() {
                total += values[idx];
                values[idx] = total;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
