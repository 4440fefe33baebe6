//! Snapshot error types.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot not found.
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Snapshot directory exists but its manifest does not.
    #[error("Manifest not found for snapshot: {0}")]
    ManifestNotFound(String),

    /// A file's stored content could not be located.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Compression failed.
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// Decompression failed.
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// Writing a file failed.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a file failed.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid snapshot ID.
    #[error("Invalid snapshot ID: {0}")]
    InvalidId(String),

    /// A manifest path escapes the project root.
    #[error("Invalid path in manifest: {0}")]
    InvalidPath(String),

    /// Stored content does not match its recorded hash.
    #[error("Snapshot storage corrupted: {0}")]
    Corrupted(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation was cancelled by its caller.
    #[error("Snapshot operation cancelled")]
    Cancelled,

    /// A blocking worker task failed to complete.
    #[error("Snapshot task failed: {0}")]
    TaskFailed(String),
}

impl SnapshotError {
    /// Create a snapshot not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::SnapshotNotFound(id.into())
    }

    /// Create a write error for `path`.
    pub fn write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a read error for `path`.
    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<tokio::task::JoinError> for SnapshotError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
