//! Logging initialization for the CLI.

use histree_util::log::{LogConfig, LogLevel};
use std::path::PathBuf;

/// Initialize logging to stderr, or to `file` when one is given.
///
/// Verbose runs log at debug level with source locations. Otherwise stderr
/// only shows warnings and errors, while a log file also records info
/// events. `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool, file: Option<PathBuf>) {
    let level = match (verbose, file.is_some()) {
        (true, _) => LogLevel::Debug,
        (false, true) => LogLevel::Info,
        (false, false) => LogLevel::Warn,
    };
    let config = LogConfig {
        print: true,
        level,
        include_location: verbose,
        file,
    };

    if !histree_util::log::init(config) {
        eprintln!("Warning: logging was already initialized");
    }
}
