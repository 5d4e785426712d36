//! imdb-index CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`. The command writes its
//! own JSON result (or error envelope) to stdout; main only repeats the
//! error on stderr and sets the exit code.

use imdb_index::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
