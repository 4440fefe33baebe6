//! Snapshot configuration.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Built-in defaults
//! 2. `<root>/config.json` (every field optional)
//! 3. Environment overrides: `HISTREE_*` variables

use crate::{SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Name of the optional configuration file under the store root.
pub const CONFIG_FILE: &str = "config.json";

/// Default maximum size of a file that will be captured (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Configuration for snapshot storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotConfig {
    /// Whether snapshots are enabled.
    pub enabled: bool,

    /// Minimum number of seconds between advised snapshots of one project.
    pub debounce_secs: u64,

    /// Files larger than this many bytes are not captured.
    pub max_file_size: u64,

    /// Directory names that are never descended into.
    pub excluded_dirs: Vec<String>,

    /// File name patterns to skip. `*suffix` matches by suffix, anything
    /// else must match exactly.
    pub excluded_patterns: Vec<String>,

    /// Number of snapshots the automatic retention pass keeps per project.
    pub keep_count: usize,

    /// Snapshots older than this are removed by the automatic retention pass.
    pub max_age_days: Option<u32>,

    /// Whether to run retention in the background after each snapshot.
    pub auto_cleanup: bool,

    /// DEFLATE level, 0 (none) to 9 (best).
    pub compression_level: u32,

    /// Hash files whose size and mtime look unchanged to catch rewrites
    /// that preserved both.
    pub verify_content: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_secs: 30,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            excluded_dirs: default_excluded_dirs(),
            excluded_patterns: default_excluded_patterns(),
            keep_count: 50,
            max_age_days: None,
            auto_cleanup: true,
            compression_level: 6,
            verify_content: false,
        }
    }
}

fn default_excluded_dirs() -> Vec<String> {
    [
        ".git",
        ".svn",
        ".hg",
        "node_modules",
        "target",
        "build",
        "dist",
        ".build",
        "DerivedData",
        "__pycache__",
        ".venv",
        "venv",
        ".gradle",
        ".idea",
        ".vscode",
        "Pods",
        ".next",
        ".cache",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excluded_patterns() -> Vec<String> {
    [
        ".DS_Store",
        "*.pyc",
        "*.pyo",
        "*.o",
        "*.swp",
        "*.swo",
        "*~",
        "*.tmp",
        "*.log",
        "Thumbs.db",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl SnapshotConfig {
    /// Load configuration for a store rooted at `root`.
    ///
    /// A missing config file is not an error; a malformed one is.
    pub async fn load(root: &Path) -> SnapshotResult<Self> {
        let path = root.join(CONFIG_FILE);
        let config = match fs::read_to_string(&path).await {
            Ok(content) => Self::parse(&content, &path.display().to_string())?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(SnapshotError::read(&path, e)),
        };

        config.apply_env(|key| std::env::var(key).ok())
    }

    /// Parse a JSON configuration document.
    pub fn parse(content: &str, origin: &str) -> SnapshotResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| SnapshotError::config(format!("Invalid config in {origin}: {e}")))
    }

    /// Apply `HISTREE_*` overrides looked up through `lookup`.
    pub fn apply_env<F>(mut self, lookup: F) -> SnapshotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HISTREE_DEBOUNCE_SECS") {
            self.debounce_secs = parse_env("HISTREE_DEBOUNCE_SECS", &v)?;
        }
        if let Some(v) = lookup("HISTREE_KEEP_COUNT") {
            self.keep_count = parse_env("HISTREE_KEEP_COUNT", &v)?;
        }
        if let Some(v) = lookup("HISTREE_MAX_FILE_SIZE") {
            self.max_file_size = parse_env("HISTREE_MAX_FILE_SIZE", &v)?;
        }
        if let Some(v) = lookup("HISTREE_AUTO_CLEANUP") {
            self.auto_cleanup = parse_bool("HISTREE_AUTO_CLEANUP", &v)?;
        }
        Ok(self)
    }

    /// Compression level clamped to the range DEFLATE accepts.
    pub fn effective_compression_level(&self) -> u32 {
        self.compression_level.min(9)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> SnapshotResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SnapshotError::config(format!("{name} has invalid value '{value}'")))
}

fn parse_bool(name: &str, value: &str) -> SnapshotResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SnapshotError::config(format!(
            "{name} has invalid value '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SnapshotConfig::default();
        assert!(config.enabled);
        assert_eq!(config.debounce_secs, 30);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert!(config.excluded_dirs.iter().any(|d| d == "node_modules"));
        assert!(config.excluded_patterns.iter().any(|p| p == "*.pyc"));
        assert!(!config.verify_content);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SnapshotConfig::parse(r#"{"keepCount": 5, "verifyContent": true}"#, "test")
            .unwrap();
        assert_eq!(config.keep_count, 5);
        assert!(config.verify_content);
        assert_eq!(config.debounce_secs, 30);
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = SnapshotConfig::parse("{not json", "test").unwrap_err();
        assert!(matches!(err, SnapshotError::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let config = SnapshotConfig::default()
            .apply_env(lookup_from(&[
                ("HISTREE_DEBOUNCE_SECS", "5"),
                ("HISTREE_KEEP_COUNT", "3"),
                ("HISTREE_AUTO_CLEANUP", "false"),
            ]))
            .unwrap();
        assert_eq!(config.debounce_secs, 5);
        assert_eq!(config.keep_count, 3);
        assert!(!config.auto_cleanup);
    }

    #[test]
    fn invalid_env_value_names_variable() {
        let err = SnapshotConfig::default()
            .apply_env(lookup_from(&[("HISTREE_KEEP_COUNT", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("HISTREE_KEEP_COUNT"));
    }

    #[test]
    fn compression_level_is_clamped() {
        let config = SnapshotConfig {
            compression_level: 42,
            ..Default::default()
        };
        assert_eq!(config.effective_compression_level(), 9);
    }

    #[tokio::test]
    async fn load_reads_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{"debounceSecs": 2}"#)
            .await
            .unwrap();
        let config = SnapshotConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.debounce_secs, 2);
    }

    #[tokio::test]
    async fn load_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SnapshotConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.keep_count, SnapshotConfig::default().keep_count);
    }
}
