mod bootstrap;
mod commands;
mod prompt;
mod report;

use anyhow::Result;
use clap::Parser;
use stretch_core::config::ProjectConfig;
use stretch_core::settings::Settings;

use crate::commands::Context;

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("ms-stretch v{} starting", env!("CARGO_PKG_VERSION"));

    let project = bootstrap::resolve_project_dir(&settings.project)?;
    let config = ProjectConfig::load_from(&settings.config_path())?;
    tracing::debug!(
        "Project {}, stretching max {} over {} steps",
        project.display(),
        config.stretching_max,
        config.stretching_nsteps
    );

    let ctx = Context::new(project, config, settings.missing_policy());
    commands::run(&ctx, &settings.command)
}
