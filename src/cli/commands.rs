//! CLI command implementations
//!
//! Every command loads the configuration first and applies its log level.
//! `build` runs the catalog build on a tokio runtime; queries open only
//! the domain they need.

use std::path::Path;

use serde_json::json;

use crate::catalog::{Catalog, IndexConfig};
use crate::domain::{AkaIndex, EpisodeIndex, RatingIndex};
use crate::observability::Logger;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command. Failures
/// are written to stdout as an error envelope and returned for the exit
/// code.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Build { config } => build(&config),
        Command::Akas { config, id } => akas(&config, &id),
        Command::Episodes {
            config,
            show,
            season,
        } => episodes(&config, &show, season),
        Command::Episode { config, id } => episode(&config, &id),
        Command::Rating { config, id } => rating(&config, &id),
    }
}

fn load_config(path: &Path) -> CliResult<IndexConfig> {
    let config = IndexConfig::load(path)?;
    if let Some(severity) = config.severity() {
        Logger::set_min_severity(severity);
    }
    Ok(config)
}

/// Build every index and report what was built
pub fn build(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;
    let catalog = rt.block_on(Catalog::create_all(&config))?;

    write_response(&json!({
        "index_dir": catalog.index_dir().display().to_string(),
        "domains": catalog.describe(),
    }))
}

pub fn akas(config_path: &Path, id: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let index = AkaIndex::open(&config.index_dir, &config.open_options())?;
    write_response(&index.find(id)?)
}

pub fn episodes(config_path: &Path, show: &str, season: Option<u32>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let index = EpisodeIndex::open(&config.index_dir, &config.open_options())?;
    let found = match season {
        Some(season) => index.episodes_by_season(show, season)?,
        None => index.episodes_by_show(show)?,
    };
    write_response(&found)
}

pub fn episode(config_path: &Path, id: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let index = EpisodeIndex::open(&config.index_dir, &config.open_options())?;
    write_response(&index.episode_by_id(id)?)
}

pub fn rating(config_path: &Path, id: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let index = RatingIndex::open(&config.index_dir, &config.open_options())?;
    write_response(&index.rating_by_id(id)?)
}
