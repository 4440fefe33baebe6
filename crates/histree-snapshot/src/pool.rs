//! Content-addressed blob pool shared by all snapshots of one project.
//!
//! Blobs live at `objects/<first-2-hex>/<remaining-hex>.<gz|raw>`. A blob
//! that failed to compress is kept uncompressed under the `.raw` suffix;
//! reads try the compressed form first.

use crate::codec::{check_raw, BlobEncoding, Compressor};
use crate::manifest::{atomic_write, ContentHash};
use crate::{SnapshotError, SnapshotResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Blob storage for one project.
#[derive(Debug, Clone)]
pub struct ObjectPool {
    /// The `objects/` directory.
    root: PathBuf,
}

impl ObjectPool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob for `hash` in the given encoding.
    pub fn blob_path(&self, hash: &ContentHash, encoding: BlobEncoding) -> PathBuf {
        self.root
            .join(hash.prefix())
            .join(format!("{}.{}", hash.suffix(), encoding.extension()))
    }

    /// Whether a blob for `hash` exists in either encoding.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        BlobEncoding::READ_ORDER
            .iter()
            .any(|enc| self.blob_path(hash, *enc).is_file())
    }

    /// Store `content` under `hash` unless it is already present.
    ///
    /// Returns the number of bytes written, 0 when the blob already existed.
    /// Compression failures fall back to storing the content uncompressed.
    pub fn put(
        &self,
        hash: &ContentHash,
        content: &[u8],
        compressor: &dyn Compressor,
    ) -> SnapshotResult<u64> {
        if self.contains(hash) {
            return Ok(0);
        }

        let (encoding, bytes) = match compressor.compress(content) {
            Ok(compressed) => (BlobEncoding::Gzip, compressed),
            Err(e) => {
                warn!(hash = %hash, error = %e, "Compression failed, storing blob uncompressed");
                (BlobEncoding::Raw, content.to_vec())
            }
        };

        let path = self.blob_path(hash, encoding);
        atomic_write(&path, &bytes)?;
        debug!(hash = %hash, encoding = encoding.extension(), bytes = bytes.len(), "Stored blob");
        Ok(bytes.len() as u64)
    }

    /// Load the content stored under `hash`, expected to be `size` bytes.
    ///
    /// Returns `Ok(None)` when no blob exists in either encoding. Content that
    /// does not hash back to `hash` is reported as `Corrupted`.
    pub fn get(
        &self,
        hash: &ContentHash,
        size: u64,
        compressor: &dyn Compressor,
    ) -> SnapshotResult<Option<Vec<u8>>> {
        for encoding in BlobEncoding::READ_ORDER {
            let path = self.blob_path(hash, encoding);
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(SnapshotError::read(&path, e)),
            };

            let content = match encoding {
                BlobEncoding::Gzip => compressor.decompress(&bytes, size)?,
                BlobEncoding::Raw => check_raw(bytes, size)?,
            };

            if ContentHash::of(&content) != *hash {
                return Err(SnapshotError::Corrupted(format!(
                    "blob {} does not match its hash",
                    path.display()
                )));
            }
            return Ok(Some(content));
        }
        Ok(None)
    }

    /// Remove every blob whose hash is not in `live`.
    ///
    /// Returns the number of blobs removed. Empty shard directories are
    /// removed as well.
    pub fn sweep(&self, live: &HashSet<ContentHash>) -> SnapshotResult<usize> {
        let shards = match fs::read_dir(&self.root) {
            Ok(shards) => shards,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(SnapshotError::read(&self.root, e)),
        };

        let mut removed = 0;
        for shard in shards {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            let prefix = shard.file_name().to_string_lossy().into_owned();

            for blob in fs::read_dir(shard.path())? {
                let blob = blob?;
                let name = blob.file_name().to_string_lossy().into_owned();

                let dead = if name.starts_with('.') {
                    // leftover temp file from an interrupted write
                    true
                } else {
                    match parse_blob_name(&prefix, &name) {
                        Some(hash) => !live.contains(&hash),
                        None => false,
                    }
                };

                if dead {
                    fs::remove_file(blob.path()).map_err(|e| SnapshotError::write(blob.path(), e))?;
                    removed += 1;
                }
            }

            // Only succeeds when the shard is now empty.
            let _ = fs::remove_dir(shard.path());
        }

        if removed > 0 {
            debug!(pool = %self.root.display(), removed, "Swept unreferenced blobs");
        }
        Ok(removed)
    }

    /// Total size in bytes of all stored blobs.
    pub fn usage(&self) -> SnapshotResult<u64> {
        dir_size(&self.root)
    }
}

fn parse_blob_name(prefix: &str, name: &str) -> Option<ContentHash> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext != BlobEncoding::Gzip.extension() && ext != BlobEncoding::Raw.extension() {
        return None;
    }
    format!("{prefix}{stem}").parse().ok()
}

/// Recursive size of all files under `dir`; 0 if it does not exist.
pub(crate) fn dir_size(dir: &Path) -> SnapshotResult<u64> {
    let mut total = 0;
    for entry in walkdir::WalkDir::new(dir).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::NotFound) => {
                continue
            }
            Err(e) => return Err(SnapshotError::Io(e.into())),
        };
        if entry.file_type().is_file() {
            total += entry.metadata().map(|m| m.len()).unwrap_or_default();
        }
    }
    Ok(total)
}
