use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name to a tracing filter directive.
///
/// Unrecognised names pass through unchanged so that full `EnvFilter`
/// directives also work.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr so that stdout carries only the report. Falls back
/// to `"info"` if the level string is not a valid directive.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();

    Ok(())
}

// ── Project directory ──────────────────────────────────────────────────────────

/// Check that the project directory exists and return it in absolute form.
pub fn resolve_project_dir(project: &Path) -> anyhow::Result<PathBuf> {
    if !project.is_dir() {
        anyhow::bail!("Project directory {} does not exist", project.display());
    }
    project
        .canonicalize()
        .with_context(|| format!("resolving {}", project.display()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("stretch_data=trace"), "stretch_data=trace");
    }

    #[test]
    fn test_resolve_project_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let resolved = resolve_project_dir(tmp.path()).expect("existing dir");
        assert!(resolved.is_absolute());
        assert!(resolved.is_dir());

        assert!(resolve_project_dir(&tmp.path().join("missing")).is_err());
    }
}
