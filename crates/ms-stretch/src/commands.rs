//! One handler per subcommand. Each builds a [`Report`] and hands it to
//! [`emit`] for printing and CSV output.

use std::io;
use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDateTime;
use stretch_core::config::{MissingFilePolicy, ProjectConfig};
use stretch_core::filters::{resolve_filters, FilterSpec};
use stretch_core::pairs::{nicen_pairs, NicePairs, PairSelector, PairSubstitutions};
use stretch_core::settings::{Command, ForcingArgs, MultiForcingArgs, PgvArgs, SeriesArgs};
use stretch_core::stations::{DefaultStations, ForcingDefaults, PlotStyle, ALL_STATIONS};
use stretch_core::stats::ratio_to_percent;
use stretch_data::averager::{get_corr, get_dvv, get_dvv_mat, MeanMedianSeries, SeriesQuery};
use stretch_data::forcing::{list_stations, load_forcing};
use stretch_data::pgv::{load_pgv, pgv_stations, station_events, station_label};
use stretch_data::store::ResultStore;
use tracing::{info, warn};

use crate::prompt::ask_stations;
use crate::report::{output_path, series_label, title_lines, window_heading, Report, Section, Series};

/// Default window of the forcing and correlation commands.
const FORCING_WINDOW: u32 = 10;
/// Most forcings `mforcing` shows at once.
const MAX_FORCINGS: usize = 3;

// ── Context ───────────────────────────────────────────────────────────────────

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    pub project: PathBuf,
    pub config: ProjectConfig,
    pub missing: MissingFilePolicy,
    pub store: ResultStore,
}

impl Context {
    pub fn new(project: PathBuf, config: ProjectConfig, missing: MissingFilePolicy) -> Self {
        let store = ResultStore::new(&project);
        Self {
            project,
            config,
            missing,
            store,
        }
    }

    fn nice_pairs(&self, pairs: &[String], custom: bool) -> anyhow::Result<NicePairs> {
        let substitutions = if custom {
            Some(PairSubstitutions::load_from(&PairSubstitutions::path_in(
                &self.project,
            ))?)
        } else {
            None
        };
        Ok(nicen_pairs(pairs, substitutions.as_ref()))
    }

    fn query(&self, window: u32, components: &[String], filter: &FilterSpec, pairs: &PairSelector) -> SeriesQuery {
        SeriesQuery::new(window, components.to_vec(), filter.dir_key.clone(), pairs.clone())
            .with_missing(self.missing)
    }

    fn default_stations(&self) -> anyhow::Result<DefaultStations> {
        Ok(DefaultStations::load_from(&DefaultStations::path_in(
            &self.project,
        ))?)
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

pub fn run(ctx: &Context, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Dvv(args) => {
            let windows = args.mov_stacks(&ctx.config, 0)?;
            let (report, filters) = dvv_report(ctx, args, &windows)?;
            emit(&report, "dvv", args, &filters, &windows)
        }
        Command::Corr(args) => {
            let windows = args.mov_stacks(&ctx.config, FORCING_WINDOW)?;
            let (report, filters) = corr_report(ctx, args, &windows)?;
            emit(&report, "corr", args, &filters, &windows)
        }
        Command::Forcing(args) => {
            let windows = args.series.mov_stacks(&ctx.config, FORCING_WINDOW)?;
            let (report, filters) = forcing_report(ctx, args, &windows)?;
            emit(&report, "forcing", &args.series, &filters, &windows)
        }
        Command::Mforcing(args) => {
            let windows = args.series.mov_stacks(&ctx.config, FORCING_WINDOW)?;
            let (report, filters) = mforcing_report(ctx, args, &windows)?;
            emit(&report, "mforcing", &args.series, &filters, &windows)
        }
        Command::Mat(args) => {
            let windows = args.mov_stacks(&ctx.config, 0)?;
            let (report, filters) = mat_report(ctx, args, &windows)?;
            emit(&report, "mat", args, &filters, &windows)
        }
        Command::Pgv(args) => pgv(ctx, args),
        Command::Install => install(ctx),
        Command::Uninstall => uninstall(ctx),
    }
}

/// Print the report and write the CSV, as requested.
fn emit(
    report: &Report,
    command: &str,
    args: &SeriesArgs,
    filters: &[FilterSpec],
    windows: &[u32],
) -> anyhow::Result<()> {
    if args.show {
        let stdout = io::stdout();
        report.render_text(&mut stdout.lock())?;
    }
    if let Some(outfile) = &args.outfile {
        let filter_ref = filters.first().map(|f| f.ref_number).unwrap_or(0);
        let path = output_path(command, outfile, &args.component_list(), filter_ref, windows);
        report.write_csv(&path)?;
        info!("Output written to {}", path.display());
    }
    Ok(())
}

// ── dv/v series ───────────────────────────────────────────────────────────────

/// The selectors to load with their display names.
///
/// Averaging over all pairs uses the first selector only.
fn selections(pairs: &NicePairs) -> Vec<(&PairSelector, &str)> {
    let all = pairs.selectors.iter().zip(pairs.display.iter().map(String::as_str));
    if pairs.is_all() {
        all.take(1).collect()
    } else {
        all.collect()
    }
}

/// Add the curves of one aggregated series following the legend rules.
fn push_curves(
    section: &mut Section,
    series: &MeanMedianSeries,
    filter: &FilterSpec,
    pair: &str,
    all_pairs: bool,
    n_filters: usize,
) {
    if all_pairs && n_filters == 1 {
        section.push(Series::new("mean", series.means()));
        section.push(Series::new("median", series.medians()));
    } else {
        section.push(Series::new(
            series_label(filter, pair, all_pairs, n_filters),
            series.means(),
        ));
    }
}

/// One dv/v section per window with a curve per filter and pair group.
fn dvv_sections(
    ctx: &Context,
    components: &[String],
    filters: &[FilterSpec],
    pairs: &NicePairs,
    windows: &[u32],
) -> anyhow::Result<Vec<Section>> {
    let mut sections = Vec::with_capacity(windows.len());
    for &window in windows {
        let mut section = Section::new(window_heading(window)).with_note("dv/v (%)");
        for filter in filters {
            for (selector, display) in selections(pairs) {
                let series = get_dvv(&ctx.store, &ctx.query(window, components, filter, selector))
                    .with_context(|| format!("loading dv/v for filter {} window {}", filter, window))?;
                push_curves(&mut section, &series, filter, display, pairs.is_all(), filters.len());
            }
        }
        sections.push(section);
    }
    Ok(sections)
}

fn series_setup(ctx: &Context, args: &SeriesArgs) -> anyhow::Result<(Vec<String>, Vec<FilterSpec>, NicePairs)> {
    let components = args.component_list();
    if components.is_empty() {
        anyhow::bail!("No components given");
    }
    let filters = resolve_filters(args.filterid.as_slice(), &ctx.config)?;
    let pairs = ctx.nice_pairs(&args.pairs, args.custom)?;
    Ok((components, filters, pairs))
}

pub fn dvv_report(
    ctx: &Context,
    args: &SeriesArgs,
    windows: &[u32],
) -> anyhow::Result<(Report, Vec<FilterSpec>)> {
    let (components, filters, pairs) = series_setup(ctx, args)?;
    let mut report = Report::new(title_lines(&components, &pairs, &filters));
    report.sections = dvv_sections(ctx, &components, &filters, &pairs, windows)?;
    Ok((report, filters))
}

pub fn corr_report(
    ctx: &Context,
    args: &SeriesArgs,
    windows: &[u32],
) -> anyhow::Result<(Report, Vec<FilterSpec>)> {
    let (components, mut filters, pairs) = series_setup(ctx, args)?;
    if filters.len() > 1 {
        warn!("corr shows one filter, using {}", filters[0]);
        filters.truncate(1);
    }
    let filter = &filters[0];

    let mut report = Report::new(title_lines(&components, &pairs, &filters));
    for &window in windows {
        let mut dvv = Section::new(window_heading(window)).with_note("dv/v (%)");
        let mut coeff = Section::new(format!(
            "Correlation coefficients for the stretching method, {}",
            window_heading(window)
        ))
        .with_note("Correlation coefficient");

        for (selector, display) in selections(&pairs) {
            let query = ctx.query(window, &components, filter, selector);
            let series = get_dvv(&ctx.store, &query)?;
            push_curves(&mut dvv, &series, filter, display, pairs.is_all(), 1);
            let series = get_corr(&ctx.store, &query)?;
            push_curves(&mut coeff, &series, filter, display, pairs.is_all(), 1);
        }
        report.sections.push(dvv);
        report.sections.push(coeff);
    }
    Ok((report, filters))
}

pub fn mat_report(
    ctx: &Context,
    args: &SeriesArgs,
    windows: &[u32],
) -> anyhow::Result<(Report, Vec<FilterSpec>)> {
    let (components, filters, pairs) = series_setup(ctx, args)?;
    let stretching = ctx.config.stretching();

    let mut report = Report::new(title_lines(&components, &pairs, &filters));
    for &window in windows {
        let mut section =
            Section::new(window_heading(window)).with_note("dv/v (%) at the coefficient maximum");
        for filter in &filters {
            for (selector, display) in selections(&pairs) {
                let query = ctx.query(window, &components, filter, selector);
                let matrix = get_dvv_mat(&ctx.store, &query, stretching)?;
                let points = matrix
                    .dvv
                    .iter()
                    .map(|(d, ratio)| (*d, ratio_to_percent(*ratio)))
                    .collect();
                section.push(Series::new(
                    series_label(filter, display, pairs.is_all(), filters.len()),
                    points,
                ));
            }
        }
        report.sections.push(section);
    }
    Ok((report, filters))
}

// ── Forcings ──────────────────────────────────────────────────────────────────

/// Stations for one forcing: asked interactively or the table default.
fn choose_stations(ctx: &Context, defaults: &ForcingDefaults, ask: bool) -> anyhow::Result<Vec<String>> {
    if !ask {
        return Ok(vec![defaults.default_station.clone()]);
    }
    let available = list_stations(&ctx.project.join(&defaults.folder_name))?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let chosen = ask_stations(&mut stdin.lock(), &mut stdout.lock(), &defaults.forcing, &available)?;
    if chosen.is_empty() {
        anyhow::bail!("No stations chosen for {}", defaults.forcing);
    }
    Ok(chosen)
}

/// `Precipitation data for station: Daguan`.
fn stations_heading(name: &str, stations: &[String]) -> String {
    if stations.iter().any(|s| s.eq_ignore_ascii_case(ALL_STATIONS)) {
        format!("{} data for all the stations", name)
    } else if stations.len() == 1 {
        format!("{} data for station: {}", name, stations[0])
    } else {
        format!("{} data for stations: {}", name, stations.join(", "))
    }
}

/// Load one forcing, clipped to `range`, as a report section.
pub fn forcing_section(
    ctx: &Context,
    defaults: &ForcingDefaults,
    stations: &[String],
    range: Option<(NaiveDateTime, NaiveDateTime)>,
) -> anyhow::Result<Section> {
    let folder = ctx.project.join(&defaults.folder_name);
    let mut data = load_forcing(&folder, stations, ctx.missing)
        .with_context(|| format!("loading {}", defaults.forcing))?;
    if let Some((start, end)) = range {
        data = data.clip(start, end);
    }
    let style = defaults.plot_style();
    if style == PlotStyle::Cumsum {
        data = data.cumulative();
    }

    let label = defaults.label();
    let heading_name = match style {
        PlotStyle::Cumsum => format!("Cumulative {}", defaults.forcing.to_lowercase()),
        _ => defaults.forcing.clone(),
    };
    let mut section = Section::new(stations_heading(&heading_name, stations))
        .with_note(format!("{} ({})", label, style));
    if let Some(max) = data.max_value() {
        section = section.with_note(format!("Maximum: {:.4}", max));
    }

    section.push(Series::new(label.clone(), data.values()));
    if style == PlotStyle::Errorbars {
        match data.errors() {
            Some(errors) => section.push(Series::new(format!("{} error", label), errors)),
            None => warn!("{} has no Error column", defaults.forcing),
        }
    }
    Ok(section)
}

/// Date range covered by the dv/v sections.
fn dvv_range(sections: &[Section]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    sections
        .iter()
        .filter_map(Section::date_range)
        .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
}

fn forcing_sections(
    ctx: &Context,
    report: &mut Report,
    forcings: &[&ForcingDefaults],
    ask: bool,
) -> anyhow::Result<()> {
    let range = dvv_range(&report.sections);
    for defaults in forcings {
        let stations = choose_stations(ctx, defaults, ask)?;
        report
            .sections
            .push(forcing_section(ctx, defaults, &stations, range)?);
    }
    Ok(())
}

pub fn forcing_report(
    ctx: &Context,
    args: &ForcingArgs,
    windows: &[u32],
) -> anyhow::Result<(Report, Vec<FilterSpec>)> {
    let table = ctx.default_stations()?;
    let defaults = match &args.forcing {
        Some(name) => table.get(name)?,
        None => table.default_forcing()?,
    };

    let (mut report, filters) = dvv_report(ctx, &args.series, windows)?;
    forcing_sections(ctx, &mut report, &[defaults], args.ask)?;
    Ok((report, filters))
}

pub fn mforcing_report(
    ctx: &Context,
    args: &MultiForcingArgs,
    windows: &[u32],
) -> anyhow::Result<(Report, Vec<FilterSpec>)> {
    if args.forcings.len() > MAX_FORCINGS {
        anyhow::bail!(
            "At most {} forcings can be shown, got {}",
            MAX_FORCINGS,
            args.forcings.len()
        );
    }
    let table = ctx.default_stations()?;
    let forcings = if args.forcings.is_empty() {
        vec![table.default_forcing()?]
    } else {
        args.forcings
            .iter()
            .map(|name| table.get(name))
            .collect::<stretch_core::Result<Vec<_>>>()?
    };

    let (mut report, filters) = dvv_report(ctx, &args.series, windows)?;
    forcing_sections(ctx, &mut report, &forcings, args.ask)?;
    Ok((report, filters))
}

// ── PGV ───────────────────────────────────────────────────────────────────────

pub fn pgv_report(ctx: &Context, args: &PgvArgs) -> anyhow::Result<Report> {
    let pairs = ctx.nice_pairs(&args.pairs, args.custom)?;
    let events = load_pgv(&ctx.project.join(&ctx.config.pgv.file))?;

    let mut title = String::from("Peak ground velocity, ");
    if pairs.is_all() {
        title.push_str("Average over all pairs");
    } else {
        title.push_str(&format!("Pairs: {}", pairs.display.join(", ")));
    }

    let mut section = Section::new("PGV per station").with_note("PGV");
    for station in pgv_stations(&pairs, &ctx.config.pgv) {
        let points = station_events(&events, station);
        if points.is_empty() {
            warn!("No PGV events for station {}", station);
        }
        section.push(Series::new(station_label(station), points));
    }

    let mut report = Report::new(vec![title]);
    report.sections.push(section);
    Ok(report)
}

fn pgv(ctx: &Context, args: &PgvArgs) -> anyhow::Result<()> {
    let report = pgv_report(ctx, args)?;
    if args.show {
        let stdout = io::stdout();
        report.render_text(&mut stdout.lock())?;
    }
    if let Some(outfile) = &args.outfile {
        let name = outfile.replacen('?', "stations", 1);
        let path = output_path("pgv", &name, &[], 0, &[]);
        report.write_csv(&path)?;
        info!("Output written to {}", path.display());
    }
    Ok(())
}

// ── Table management ──────────────────────────────────────────────────────────

fn install(ctx: &Context) -> anyhow::Result<()> {
    let path = DefaultStations::path_in(&ctx.project);
    if DefaultStations::install(&path)? {
        println!("Default stations table created at {}", path.display());
    } else {
        println!("Default stations table already exists at {}", path.display());
    }
    Ok(())
}

fn uninstall(ctx: &Context) -> anyhow::Result<()> {
    let path = DefaultStations::path_in(&ctx.project);
    if DefaultStations::uninstall(&path)? {
        println!("Default stations table removed from {}", path.display());
    } else {
        println!("No default stations table at {}", path.display());
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
