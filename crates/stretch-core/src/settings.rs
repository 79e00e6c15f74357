use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{MissingFilePolicy, ProjectConfig};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Average stretching dv/v results and environmental forcings
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ms-stretch",
    about = "Average stretching dv/v results and environmental forcings",
    version
)]
pub struct Settings {
    /// Project directory holding STR/, STR_Mat/ and the forcing folders
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Project config file (defaults to <project>/ms_stretch.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Skip missing pair or station files instead of aborting
    #[arg(long, global = true)]
    pub skip_missing: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands, one per plot variant plus table management.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// dv/v curves for one or more windows, filters and pairs
    Dvv(SeriesArgs),
    /// dv/v curves with their correlation coefficients
    Corr(SeriesArgs),
    /// dv/v curves with one forcing
    Forcing(ForcingArgs),
    /// dv/v curves with several forcings
    Mforcing(MultiForcingArgs),
    /// dv/v derived from averaged stretching-coefficient matrices
    Mat(SeriesArgs),
    /// Peak ground velocity per station
    Pgv(PgvArgs),
    /// Create the default stations table
    Install,
    /// Drop the default stations table
    Uninstall,
}

/// Options shared by every series command.
#[derive(Args, Debug, Clone)]
pub struct SeriesArgs {
    /// Moving-stack window in days (0 = every window in the project config)
    #[arg(short = 'm', long)]
    pub mov_stack: Option<u32>,

    /// Components, comma separated (ZZ, ZR, ...)
    #[arg(short, long, default_value = "ZZ")]
    pub components: String,

    /// Filter ID, optionally with a lag window: 1 or 1_2_4
    #[arg(short, long = "filterid", default_values_t = vec!["1".to_string()])]
    pub filterid: Vec<String>,

    /// Pair(s) to show; comma-separated pairs are averaged together
    #[arg(short, long)]
    pub pairs: Vec<String>,

    /// Use change_pairs.csv for display names
    #[arg(long)]
    pub custom: bool,

    /// Print the report to stdout
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    pub show: bool,

    /// Output CSV filename (a leading ? is expanded)
    #[arg(short, long)]
    pub outfile: Option<String>,
}

impl SeriesArgs {
    /// Split the component list.
    pub fn component_list(&self) -> Vec<String> {
        self.components
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Windows to process: the explicit one, or the config list for `0`.
    ///
    /// `fallback` applies when no window was given.
    pub fn mov_stacks(&self, config: &ProjectConfig, fallback: u32) -> crate::Result<Vec<u32>> {
        match self.mov_stack.unwrap_or(fallback) {
            0 => config.mov_stacks(),
            days => Ok(vec![days]),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ForcingArgs {
    #[command(flatten)]
    pub series: SeriesArgs,

    /// Forcing short name (defaults to the first table entry)
    #[arg(short = 'F', long)]
    pub forcing: Option<String>,

    /// Ask which stations to use instead of the default station
    #[arg(short, long)]
    pub ask: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MultiForcingArgs {
    #[command(flatten)]
    pub series: SeriesArgs,

    /// Forcing short names; the first is shown with the dv/v curve
    #[arg(short = 'F', long = "forcings")]
    pub forcings: Vec<String>,

    /// Ask which stations to use instead of the default station
    #[arg(short, long)]
    pub ask: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PgvArgs {
    /// Pair(s) whose station numbers select the PGV stations
    #[arg(short, long)]
    pub pairs: Vec<String>,

    /// Use change_pairs.csv for display names
    #[arg(long)]
    pub custom: bool,

    /// Print the report to stdout
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    pub show: bool,

    /// Output CSV filename
    #[arg(short, long)]
    pub outfile: Option<String>,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Path of the project config file.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| ProjectConfig::path_in(&self.project))
    }

    /// Log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    pub fn missing_policy(&self) -> MissingFilePolicy {
        if self.skip_missing {
            MissingFilePolicy::Skip
        } else {
            MissingFilePolicy::Abort
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(args: &[&str]) -> Settings {
        Settings::try_parse_from(args).expect("valid args")
    }

    #[test]
    fn test_dvv_defaults() {
        let settings = parse(&["ms-stretch", "dvv"]);
        let Command::Dvv(ref args) = settings.command else {
            panic!("expected dvv");
        };
        assert_eq!(args.mov_stack, None);
        assert_eq!(args.component_list(), vec!["ZZ".to_string()]);
        assert_eq!(args.filterid, vec!["1".to_string()]);
        assert!(args.pairs.is_empty());
        assert!(args.show);
        assert!(args.outfile.is_none());
        assert_eq!(settings.project, PathBuf::from("."));
        assert_eq!(settings.missing_policy(), MissingFilePolicy::Abort);
    }

    #[test]
    fn test_repeated_filters_and_pairs() {
        let settings = parse(&[
            "ms-stretch", "dvv", "-f", "1", "-f", "2_1_3", "-p", "A_B_C", "-p", "D_E_F",
            "-c", "ZZ,ZR", "-s", "false",
        ]);
        let Command::Dvv(ref args) = settings.command else {
            panic!("expected dvv");
        };
        assert_eq!(args.filterid, vec!["1".to_string(), "2_1_3".to_string()]);
        assert_eq!(args.pairs.len(), 2);
        assert_eq!(
            args.component_list(),
            vec!["ZZ".to_string(), "ZR".to_string()]
        );
        assert!(!args.show);
    }

    #[test]
    fn test_mov_stacks_resolution() {
        let config = ProjectConfig {
            mov_stack: "1,5,10".to_string(),
            ..ProjectConfig::default()
        };
        let settings = parse(&["ms-stretch", "dvv"]);
        let Command::Dvv(ref args) = settings.command else {
            panic!("expected dvv");
        };
        assert_eq!(args.mov_stacks(&config, 0).unwrap(), vec![1, 5, 10]);
        assert_eq!(args.mov_stacks(&config, 10).unwrap(), vec![10]);

        let settings = parse(&["ms-stretch", "corr", "-m", "3"]);
        let Command::Corr(ref args) = settings.command else {
            panic!("expected corr");
        };
        assert_eq!(args.mov_stacks(&config, 10).unwrap(), vec![3]);
    }

    #[test]
    fn test_forcing_args() {
        let settings = parse(&["ms-stretch", "mforcing", "-F", "prec", "-F", "temp", "-a"]);
        let Command::Mforcing(ref args) = settings.command else {
            panic!("expected mforcing");
        };
        assert_eq!(args.forcings, vec!["prec".to_string(), "temp".to_string()]);
        assert!(args.ask);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let settings = parse(&[
            "ms-stretch", "install", "--project", "/data/proj", "--debug", "--skip-missing",
        ]);
        assert!(matches!(settings.command, Command::Install));
        assert_eq!(settings.effective_log_level(), "DEBUG");
        assert_eq!(settings.missing_policy(), MissingFilePolicy::Skip);
        assert_eq!(
            settings.config_path(),
            Path::new("/data/proj").join("ms_stretch.json")
        );
    }

    #[test]
    fn test_subcommand_args_with_global_flags() {
        let settings = parse(&[
            "ms-stretch", "--project", "/data/proj", "dvv", "-m", "10", "--skip-missing",
        ]);
        let Command::Dvv(ref args) = settings.command else {
            panic!("expected dvv");
        };
        assert_eq!(args.mov_stack, Some(10));
        assert_eq!(settings.project, PathBuf::from("/data/proj"));
        assert_eq!(settings.missing_policy(), MissingFilePolicy::Skip);
        assert_eq!(args.component_list(), vec!["ZZ".to_string()]);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(Settings::try_parse_from(["ms-stretch", "--log-level", "LOUD", "dvv"]).is_err());
    }
}
