//! Logging setup using tracing.
//!
//! Library crates only emit events through the `tracing` macros; the binary
//! decides where they go by calling [`init`] once at startup.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Filter directive scoping this level to the histree crates.
    pub fn directive(&self) -> String {
        let level = self.as_str();
        format!("histree={level},histree_snapshot={level},histree_util={level},warn")
    }
}

/// Logging configuration.
pub struct LogConfig {
    /// Whether to print logs to stderr.
    pub print: bool,
    /// Log level.
    pub level: LogLevel,
    /// Whether to include file/line info in logs.
    pub include_location: bool,
    /// Log file path (if any). Takes precedence over `print`.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            print: false,
            level: LogLevel::Info,
            include_location: false,
            file: None,
        }
    }
}

/// Initialize logging with the given configuration.
///
/// This should be called once at application startup. Returns `false` if a
/// global subscriber was already installed.
pub fn init(config: LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if let Some(path) = &config.file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_writer(Mutex::new(file));
                return subscriber.with(fmt_layer).try_init().is_ok();
            }
            Err(e) => {
                eprintln!("Warning: could not open log file {}: {e}", path.display());
            }
        }
    }

    if config.print {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr);

        subscriber.with(fmt_layer).try_init().is_ok()
    } else {
        subscriber.try_init().is_ok()
    }
}

/// Get the default log file path.
pub fn default_log_path() -> Option<PathBuf> {
    crate::path::data_dir().map(|p| p.join("logs").join("histree.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_directive_covers_crates() {
        let directive = LogLevel::Debug.directive();
        assert!(directive.contains("histree=debug"));
        assert!(directive.contains("histree_snapshot=debug"));
    }

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert!(!config.print);
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_default_log_path_ends_with_file_name() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with("logs/histree.log"));
        }
    }
}
