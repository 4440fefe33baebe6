//! Rules deciding which directories and files are left out of a snapshot.
//!
//! Matching is deliberately plain: directory names match exactly, file
//! patterns either match exactly or, when they start with `*`, by suffix.
//! There is no regex, case folding or negation.

use crate::config::SnapshotConfig;
use std::collections::HashSet;
use std::path::{Component, Path};

/// Exclusion rules applied while scanning a project tree.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    directories: HashSet<String>,
    patterns: Vec<String>,
    max_file_size: u64,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::from_config(&SnapshotConfig::default())
    }
}

impl IgnoreRules {
    /// Build rules from explicit lists.
    pub fn new<D, P>(directories: D, patterns: P, max_file_size: u64) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            directories: directories.into_iter().map(Into::into).collect(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            max_file_size,
        }
    }

    /// Build rules from the store configuration.
    pub fn from_config(config: &SnapshotConfig) -> Self {
        Self::new(
            config.excluded_dirs.iter().cloned(),
            config.excluded_patterns.iter().cloned(),
            config.max_file_size,
        )
    }

    /// Whether a directory with this name should be pruned.
    pub fn should_ignore_directory(&self, name: &str) -> bool {
        self.directories.contains(name)
    }

    /// Whether a file with this name should be skipped.
    pub fn should_ignore_file(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => name == pattern,
        })
    }

    /// Whether a path relative to the project root is excluded.
    ///
    /// Every segment but the last is checked against the directory rule,
    /// the last against the file rule.
    pub fn should_ignore(&self, relative_path: &Path) -> bool {
        let segments: Vec<String> = relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let Some((file, dirs)) = segments.split_last() else {
            return false;
        };

        dirs.iter().any(|d| self.should_ignore_directory(d)) || self.should_ignore_file(file)
    }

    /// Whether a file of `size` bytes exceeds the cap.
    pub fn exceeds_size(&self, size: u64) -> bool {
        size > self.max_file_size
    }
}
