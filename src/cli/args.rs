//! CLI argument definitions using clap
//!
//! Commands:
//! - imdb-index build --config <path>
//! - imdb-index akas --config <path> <id>
//! - imdb-index episodes --config <path> <show> [--season N]
//! - imdb-index episode --config <path> <id>
//! - imdb-index rating --config <path> <id>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// imdb-index - sorted on-disk indexes over the IMDb title datasets
#[derive(Parser, Debug)]
#[command(name = "imdb-index")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every index from the configured datasets
    Build {
        /// Path to configuration file
        #[arg(long, default_value = "./imdb-index.json")]
        config: PathBuf,
    },

    /// List the alternate titles of a title
    Akas {
        /// Path to configuration file
        #[arg(long, default_value = "./imdb-index.json")]
        config: PathBuf,

        /// Title identifier, e.g. tt0000001
        id: String,
    },

    /// List the episodes of a show, optionally of one season
    Episodes {
        /// Path to configuration file
        #[arg(long, default_value = "./imdb-index.json")]
        config: PathBuf,

        /// Show identifier
        show: String,

        /// Restrict to one season
        #[arg(long)]
        season: Option<u32>,
    },

    /// Look up one episode by its identifier
    Episode {
        /// Path to configuration file
        #[arg(long, default_value = "./imdb-index.json")]
        config: PathBuf,

        /// Episode identifier
        id: String,
    },

    /// Look up the rating of a title
    Rating {
        /// Path to configuration file
        #[arg(long, default_value = "./imdb-index.json")]
        config: PathBuf,

        /// Title identifier
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
