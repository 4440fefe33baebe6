//! Project history snapshots for histree.
//!
//! This crate captures point-in-time snapshots of a project directory:
//! - Incremental capture: unchanged files are detected by size and mtime
//! - Content-addressed, compressed blob storage shared by a project's snapshots
//! - Full restore that makes the tree match a snapshot exactly
//! - Retention by count or age, with garbage collection of unused blobs
//!
//! # Example
//!
//! ```no_run
//! use histree_snapshot::{SnapshotConfig, SnapshotStore};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SnapshotStore::new("/var/lib/histree", SnapshotConfig::default());
//! let project = Path::new("/project/root");
//!
//! // Take a snapshot before editing
//! let snapshot = store
//!     .create_snapshot(project, Some("Before edit"), Some("editor"))
//!     .await?;
//!
//! // ... edit files ...
//!
//! // Go back if needed
//! store.restore_snapshot(project, snapshot.id.as_str()).await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
mod error;
pub mod ignore;
pub mod manifest;
pub mod pool;
pub mod scanner;
mod store;

pub use codec::{Compressor, GzipCompressor};
pub use config::SnapshotConfig;
pub use error::{SnapshotError, SnapshotResult};
pub use ignore::IgnoreRules;
pub use manifest::{ContentHash, FileEntry, ManifestStats, Snapshot, SnapshotId, SnapshotManifest};
pub use scanner::{DirectoryScanner, ScannedFile};
pub use store::{RestoreReport, SnapshotStore, StorageUsage, PRE_RESTORE_LABEL, RESTORE_SOURCE};
