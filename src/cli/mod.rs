//! CLI module for imdb-index
//!
//! Provides command-line interface for:
//! - build: build every index from the configured datasets
//! - akas, episodes, episode, rating: one query against a built index

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{akas, build, episode, episodes, rating, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, ok_envelope, write_error, write_response};
