//! Test fixtures for creating reproducible project trees.
//!
//! Provides a builder for temporary project directories with files, binary
//! files, permission bits and empty directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A temporary test project with configurable file structure.
///
/// Creates a temporary directory that is automatically cleaned up
/// when the built project is dropped.
///
/// # Example
///
/// ```rust
/// use histree_test_utils::fixtures::TestProject;
///
/// let project = TestProject::new()
///     .with_file("src/main.rs", "fn main() {}")
///     .with_dir("assets")
///     .build();
///
/// assert!(project.path().join("src/main.rs").exists());
/// ```
pub struct TestProject {
    temp_dir: TempDir,
    files: BTreeMap<PathBuf, Vec<u8>>,
    modes: BTreeMap<PathBuf, u32>,
    dirs: Vec<PathBuf>,
}

impl TestProject {
    /// Create a new test project builder.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            files: BTreeMap::new(),
            modes: BTreeMap::new(),
            dirs: Vec::new(),
        }
    }

    /// Add a text file to the project.
    ///
    /// The path should be relative to the project root.
    /// Parent directories are created automatically.
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.with_bytes(path, contents.into().into_bytes())
    }

    /// Add a file with arbitrary bytes.
    pub fn with_bytes(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert(path.as_ref().to_path_buf(), contents.into());
        self
    }

    /// Set the POSIX permission bits of a file added with `with_file`.
    pub fn with_mode(mut self, path: impl AsRef<Path>, mode: u32) -> Self {
        self.modes.insert(path.as_ref().to_path_buf(), mode);
        self
    }

    /// Add an empty directory to the project.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Build the project, creating all files and directories.
    pub fn build(self) -> BuiltTestProject {
        let root = self.temp_dir.path();

        for dir in &self.dirs {
            let full_path = root.join(dir);
            fs::create_dir_all(&full_path).unwrap_or_else(|e| {
                panic!("Failed to create directory {}: {}", full_path.display(), e)
            });
        }

        for (path, contents) in &self.files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).unwrap_or_else(|e| {
                    panic!(
                        "Failed to create parent directory for {}: {}",
                        full_path.display(),
                        e
                    )
                });
            }
            fs::write(&full_path, contents)
                .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
        }

        let built = BuiltTestProject {
            temp_dir: self.temp_dir,
        };
        for (path, mode) in &self.modes {
            built.set_mode(path, *mode);
        }
        built
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// A built test project with files created on disk.
///
/// The temporary directory is automatically cleaned up when this is dropped.
pub struct BuiltTestProject {
    temp_dir: TempDir,
}

impl BuiltTestProject {
    /// Get the path to the project root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Read a file from the project.
    pub fn read_file(&self, path: impl AsRef<Path>) -> String {
        let full_path = self.path().join(path.as_ref());
        fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read file {}: {}", full_path.display(), e))
    }

    /// Check if a file exists in the project.
    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.path().join(path.as_ref()).exists()
    }

    /// Write a file to the project (for modifying during tests).
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&full_path, contents.as_ref())
            .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
    }

    /// Delete a file from the project.
    pub fn delete_file(&self, path: impl AsRef<Path>) {
        let full_path = self.path().join(path.as_ref());
        fs::remove_file(&full_path)
            .unwrap_or_else(|e| panic!("Failed to delete file {}: {}", full_path.display(), e));
    }

    /// Set the POSIX permission bits of a file. No-op off Unix.
    pub fn set_mode(&self, path: impl AsRef<Path>, mode: u32) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let full_path = self.path().join(path.as_ref());
            fs::set_permissions(&full_path, fs::Permissions::from_mode(mode)).unwrap_or_else(
                |e| panic!("Failed to set mode on {}: {}", full_path.display(), e),
            );
        }
        #[cfg(not(unix))]
        let _ = (path, mode);
    }

    /// Set a file's modification time to `secs` seconds after the epoch.
    pub fn set_mtime(&self, path: impl AsRef<Path>, secs: u64) {
        let full_path = self.path().join(path.as_ref());
        let file = fs::OpenOptions::new()
            .write(true)
            .open(&full_path)
            .unwrap_or_else(|e| panic!("Failed to open {}: {}", full_path.display(), e));
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap_or_else(|e| panic!("Failed to set mtime on {}: {}", full_path.display(), e));
    }

    /// Modification time of a file.
    pub fn mtime(&self, path: impl AsRef<Path>) -> SystemTime {
        let full_path = self.path().join(path.as_ref());
        fs::metadata(&full_path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|e| panic!("Failed to stat {}: {}", full_path.display(), e))
    }
}
