//! Depth-first project tree traversal.

use crate::ignore::IgnoreRules;
use crate::{SnapshotError, SnapshotResult};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A candidate file found by the scanner. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    /// Path relative to the project root, `/`-separated.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size: u64,
    /// Seconds since the Unix epoch, with sub-second precision.
    pub mtime: f64,
    /// POSIX permission bits.
    pub mode: u32,
}

/// Walks a project tree, pruning ignored directories.
///
/// Order of the returned files is unspecified.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    rules: IgnoreRules,
}

impl DirectoryScanner {
    pub fn new(rules: IgnoreRules) -> Self {
        Self { rules }
    }

    /// Scan `root` and return every file that passes the ignore rules.
    pub fn scan(&self, root: &Path) -> SnapshotResult<Vec<ScannedFile>> {
        self.scan_cancellable(root, &CancellationToken::new())
    }

    /// Like [`scan`](Self::scan), stopping with `Cancelled` once `cancel` fires.
    pub fn scan_cancellable(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> SnapshotResult<Vec<ScannedFile>> {
        let root_meta = std::fs::metadata(root).map_err(|e| SnapshotError::read(root, e))?;
        if !root_meta.is_dir() {
            return Err(SnapshotError::read(
                root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(SnapshotError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry during scan");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(relative) = relative_path(entry.path(), root) else {
                continue;
            };

            if self.rules.should_ignore(Path::new(&relative)) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping file without metadata");
                    continue;
                }
            };

            if self.rules.exceeds_size(metadata.len()) {
                debug!(path = %relative, size = metadata.len(), "Skipping oversized file");
                continue;
            }

            files.push(ScannedFile {
                relative_path: relative,
                absolute_path: entry.path().to_path_buf(),
                size: metadata.len(),
                mtime: mtime_secs(&metadata),
                mode: permission_bits(&metadata),
            });
        }

        debug!(root = %root.display(), files = files.len(), "Scan complete");
        Ok(files)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .rules
                .should_ignore_directory(&entry.file_name().to_string_lossy())
    }
}

fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let relative = histree_util::path::relative_to(path, root)?;
    let slashed = histree_util::path::to_slash(&relative);
    (!slashed.is_empty()).then_some(slashed)
}

/// Modification time in fractional seconds since the epoch.
pub fn mtime_secs(metadata: &Metadata) -> f64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// POSIX permission bits of a file.
#[cfg(unix)]
pub fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

/// POSIX permission bits of a file.
#[cfg(not(unix))]
pub fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histree_test_utils::fixtures::TestProject;

    fn paths(files: &[ScannedFile]) -> Vec<String> {
        let mut paths: Vec<String> = files.iter().map(|f| f.relative_path.clone()).collect();
        paths.sort();
        paths
    }

    #[test]
    fn scans_nested_files_with_metadata() {
        let project = TestProject::new()
            .with_file("a.txt", "A")
            .with_file("src/lib.rs", "pub fn f() {}")
            .build();

        let files = DirectoryScanner::new(IgnoreRules::default())
            .scan(project.path())
            .unwrap();

        assert_eq!(paths(&files), vec!["a.txt", "src/lib.rs"]);
        let lib = files.iter().find(|f| f.relative_path == "src/lib.rs").unwrap();
        assert_eq!(lib.size, 13);
        assert!(lib.mtime > 0.0);
        assert_eq!(lib.absolute_path, project.path().join("src/lib.rs"));
    }

    #[test]
    fn excludes_vcs_dependency_cache_and_oversized_files() {
        let project = TestProject::new()
            .with_file("keep.txt", "keep")
            .with_file(".git/HEAD", "ref: refs/heads/main")
            .with_file("node_modules/pkg/index.js", "module.exports = 1")
            .with_bytes("big.bin", vec![0u8; 2048])
            .with_file("cache.pyc", "x")
            .build();

        let rules = IgnoreRules::new([".git", "node_modules"], ["*.pyc"], 1024);
        let files = DirectoryScanner::new(rules).scan(project.path()).unwrap();

        assert_eq!(paths(&files), vec!["keep.txt"]);
    }

    #[test]
    fn project_root_named_like_excluded_dir_is_scanned() {
        let project = TestProject::new().with_file("build/main.c", "int main;").build();
        let root = project.path().join("build");

        let files = DirectoryScanner::new(IgnoreRules::default())
            .scan(&root)
            .unwrap();

        assert_eq!(paths(&files), vec!["main.c"]);
    }

    #[cfg(unix)]
    #[test]
    fn records_permission_bits_and_skips_symlinks() {
        let project = TestProject::new()
            .with_file("run.sh", "#!/bin/sh")
            .with_mode("run.sh", 0o755)
            .build();
        std::os::unix::fs::symlink(
            project.path().join("run.sh"),
            project.path().join("link.sh"),
        )
        .unwrap();

        let files = DirectoryScanner::new(IgnoreRules::default())
            .scan(project.path())
            .unwrap();

        assert_eq!(paths(&files), vec!["run.sh"]);
        assert_eq!(files[0].mode, 0o755);
    }

    #[test]
    fn missing_root_is_read_error() {
        let err = DirectoryScanner::new(IgnoreRules::default())
            .scan(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Read { .. }));
    }

    #[test]
    fn cancelled_scan_stops() {
        let project = TestProject::new().with_file("a.txt", "A").build();
        let token = CancellationToken::new();
        token.cancel();

        let err = DirectoryScanner::new(IgnoreRules::default())
            .scan_cancellable(project.path(), &token)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Cancelled));
    }
}
