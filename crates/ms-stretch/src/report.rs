//! Text and CSV rendering of the averaged series.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;
use stretch_core::filters::FilterSpec;
use stretch_core::pairs::NicePairs;
use stretch_core::time_utils::format_date;

// ── Model ─────────────────────────────────────────────────────────────────────

/// One labelled curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(NaiveDateTime, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(NaiveDateTime, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

/// A headed group of curves sharing one axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub heading: String,
    /// Extra lines printed under the heading (axis label, maxima, ...).
    pub notes: Vec<String>,
    pub series: Vec<Series>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn push(&mut self, series: Series) {
        self.series.push(series);
    }

    /// First and last date over every curve.
    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let dates = self.series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
        dates.fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }
}

/// Everything one command produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub title: Vec<String>,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(title: Vec<String>) -> Self {
        Self {
            title,
            sections: Vec::new(),
        }
    }

    /// Print title, then one date-aligned table per section.
    pub fn render_text(&self, out: &mut impl Write) -> io::Result<()> {
        for line in &self.title {
            writeln!(out, "{}", line)?;
        }
        for section in &self.sections {
            writeln!(out)?;
            writeln!(out, "── {} ──", section.heading)?;
            for note in &section.notes {
                writeln!(out, "{}", note)?;
            }
            if section.series.is_empty() {
                writeln!(out, "(no data)")?;
                continue;
            }

            let labels: Vec<&str> = section.series.iter().map(|s| s.label.as_str()).collect();
            let widths: Vec<usize> = labels.iter().map(|l| l.chars().count().max(10)).collect();
            write!(out, "{:<16}", "Date")?;
            for (label, width) in labels.iter().zip(&widths) {
                write!(out, "  {:>w$}", label, w = *width)?;
            }
            writeln!(out)?;

            for (date, values) in align(section.series.iter()) {
                write!(out, "{:<16}", format_date(date))?;
                for (value, width) in values.iter().zip(&widths) {
                    match value {
                        Some(v) => write!(out, "  {:>w$.4}", v, w = *width)?,
                        None => write!(out, "  {:>w$}", "", w = *width)?,
                    }
                }
                writeln!(out)?;
            }
        }
        Ok(())
    }

    /// Write every curve as one column of a wide CSV keyed by date.
    ///
    /// With several sections the column names carry the section heading.
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;

        let qualify = self.sections.len() > 1;
        let mut header = vec!["Date".to_string()];
        for section in &self.sections {
            for series in &section.series {
                header.push(if qualify {
                    format!("{}: {}", section.heading, series.label)
                } else {
                    series.label.clone()
                });
            }
        }
        writer.write_record(&header)?;

        let all = self.sections.iter().flat_map(|s| s.series.iter());
        for (date, values) in align(all) {
            let mut record = vec![format_date(date)];
            record.extend(values.into_iter().map(|v| match v {
                Some(v) => v.to_string(),
                None => String::new(),
            }));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Outer-join curves on date; `None` where a curve has no value.
fn align<'a>(
    series: impl Iterator<Item = &'a Series>,
) -> BTreeMap<NaiveDateTime, Vec<Option<f64>>> {
    let series: Vec<&Series> = series.collect();
    let mut rows: BTreeMap<NaiveDateTime, Vec<Option<f64>>> = BTreeMap::new();
    for (col, s) in series.iter().enumerate() {
        for (date, value) in &s.points {
            let row = rows
                .entry(*date)
                .or_insert_with(|| vec![None; series.len()]);
            row[col] = Some(*value);
        }
    }
    rows
}

// ── Labels and titles ─────────────────────────────────────────────────────────

/// `1 Day Smoothing` / `10 Days Smoothing`.
pub fn window_heading(mov_stack: u32) -> String {
    if mov_stack == 1 {
        "1 Day Smoothing".to_string()
    } else {
        format!("{} Days Smoothing", mov_stack)
    }
}

/// Title lines: components and pairs, then one line per filter.
pub fn title_lines(components: &[String], pairs: &NicePairs, filters: &[FilterSpec]) -> Vec<String> {
    let mut first = format!("Stretching, {}, ", components.join(","));
    if pairs.is_all() {
        first.push_str("Average over all pairs");
    } else {
        first.push_str(&format!("Pairs: {}", pairs.display.join(", ")));
    }
    let mut lines = vec![first];
    lines.extend(filters.iter().map(FilterSpec::description));
    lines
}

/// Label of the mean curve for one filter and pair group.
///
/// Averages over all pairs are labelled by filter only when several filters
/// are shown; explicit pairs are labelled by pair, prefixed by the filter
/// when several filters are shown.
pub fn series_label(filter: &FilterSpec, pair: &str, all_pairs: bool, n_filters: usize) -> String {
    match (all_pairs, n_filters > 1) {
        (true, false) => "mean".to_string(),
        (true, true) => filter.short_label(),
        (false, false) => pair.to_string(),
        (false, true) => format!("{}, {}", filter.short_label(), pair),
    }
}

/// Final output path for `--outfile`.
///
/// A leading `?` expands to `<components>-f<code>[-m<window>]` (the window
/// only when exactly one is shown), the command name is prefixed and `.csv`
/// is appended when the name has no extension.
pub fn output_path(
    command: &str,
    outfile: &str,
    components: &[String],
    filter_ref: u32,
    windows: &[u32],
) -> PathBuf {
    let mut name = outfile.to_string();
    if let Some(rest) = outfile.strip_prefix('?') {
        let mut stem = format!("{}-f{}", components.join(","), filter_ref);
        if let [window] = windows {
            stem.push_str(&format!("-m{}", window));
        }
        name = format!("{}{}", stem, rest);
    }

    let path = Path::new(&name);
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut prefixed = format!("{}_{}", command, file_name);
    if path.extension().is_none() {
        prefixed.push_str(".csv");
    }
    match path.parent() {
        Some(parent) => parent.join(prefixed),
        None => PathBuf::from(prefixed),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use stretch_core::pairs::nicen_pairs;
    use stretch_core::time_utils::parse_date;
    use tempfile::TempDir;

    fn d(s: &str) -> NaiveDateTime {
        parse_date(s).unwrap()
    }

    fn filter(ref_number: u32) -> FilterSpec {
        FilterSpec {
            code: format!("{:02}", ref_number),
            dir_key: format!("{:02}", ref_number),
            ref_number,
            low_hz: 0.1,
            high_hz: 1.0,
            min_lag_s: 2.0,
            end_lag_s: 4.0,
        }
    }

    fn sample() -> Report {
        let mut report = Report::new(vec!["Stretching, ZZ, Average over all pairs".to_string()]);
        let mut section = Section::new(window_heading(5)).with_note("dv/v (%)");
        section.push(Series::new(
            "mean",
            vec![(d("2020-01-01"), 0.5), (d("2020-01-03"), -0.25)],
        ));
        section.push(Series::new("median", vec![(d("2020-01-02"), 0.125)]));
        report.sections.push(section);
        report
    }

    #[test]
    fn test_window_heading() {
        assert_eq!(window_heading(1), "1 Day Smoothing");
        assert_eq!(window_heading(10), "10 Days Smoothing");
    }

    #[test]
    fn test_series_label_rules() {
        let f = filter(1);
        assert_eq!(series_label(&f, "all", true, 1), "mean");
        assert_eq!(series_label(&f, "all", true, 2), "Filter 1, 2-4s");
        assert_eq!(series_label(&f, "A.B_C.D", false, 1), "A.B_C.D");
        assert_eq!(
            series_label(&f, "A.B_C.D", false, 3),
            "Filter 1, 2-4s, A.B_C.D"
        );
    }

    #[test]
    fn test_title_lines() {
        let nice = nicen_pairs(&["YA_UV05_YA_UV06"], None);
        let lines = title_lines(&["ZZ".to_string(), "ZR".to_string()], &nice, &[filter(1)]);
        assert_eq!(lines[0], "Stretching, ZZ,ZR, Pairs: YA.UV05_YA.UV06");
        assert_eq!(
            lines[1],
            "Filter 1 (0.10 - 1.00 Hz), Lag time window 2.0 - 4.0s"
        );

        let all = nicen_pairs::<&str>(&[], None);
        let lines = title_lines(&["ZZ".to_string()], &all, &[]);
        assert_eq!(lines, vec!["Stretching, ZZ, Average over all pairs".to_string()]);
    }

    #[test]
    fn test_output_path_expansion() {
        let comps = vec!["ZZ".to_string()];
        assert_eq!(
            output_path("dvv", "?", &comps, 1, &[10]),
            PathBuf::from("dvv_ZZ-f1-m10.csv")
        );
        assert_eq!(
            output_path("mat", "?.txt", &comps, 2, &[1, 5]),
            PathBuf::from("mat_ZZ-f2.txt")
        );
        assert_eq!(
            output_path("corr", "out/series", &comps, 1, &[5]),
            PathBuf::from("out/corr_series.csv")
        );
    }

    #[test]
    fn test_render_text_aligns_dates() {
        let mut buf = Vec::new();
        sample().render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("Stretching, ZZ, Average over all pairs\n"));
        assert!(text.contains("── 5 Days Smoothing ──"));
        assert!(text.contains("dv/v (%)"));
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("2020-")).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains("0.5000"));
        assert!(rows[1].contains("0.1250"));
        assert!(rows[2].contains("-0.2500"));
    }

    #[test]
    fn test_write_csv_wide() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dvv_out.csv");
        sample().write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Date,mean,median");
        assert_eq!(lines[1], "2020-01-01,0.5,");
        assert_eq!(lines[2], "2020-01-02,,0.125");
        assert_eq!(lines[3], "2020-01-03,-0.25,");
    }

    #[test]
    fn test_write_csv_qualifies_columns_across_sections() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        let mut report = sample();
        let mut second = Section::new(window_heading(1));
        second.push(Series::new("mean", vec![(d("2020-01-01"), 1.0)]));
        report.sections.push(second);
        report.write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next(),
            Some("Date,5 Days Smoothing: mean,5 Days Smoothing: median,1 Day Smoothing: mean")
        );
    }

    #[test]
    fn test_date_range() {
        let report = sample();
        assert_eq!(
            report.sections[0].date_range(),
            Some((d("2020-01-01"), d("2020-01-03")))
        );
        assert_eq!(Section::new("x").date_range(), None);
    }
}
