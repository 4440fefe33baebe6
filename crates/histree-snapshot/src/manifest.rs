//! Snapshot data structures and manifest persistence.

use crate::{SnapshotError, SnapshotResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name of a snapshot's manifest inside its directory.
pub const MANIFEST_FILE: &str = "manifest.json";

const MTIME_TOLERANCE: f64 = 1e-6;

/// Identifier of a snapshot: capture time in Unix milliseconds, in decimal.
///
/// Ordering is lexicographic on the string. That only matches chronological
/// order while every id has the same number of digits, which holds for
/// millisecond timestamps from 2001 until 2286.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Create an id from a millisecond timestamp.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis.to_string())
    }

    /// Parse and validate an id. Only ASCII digits are accepted.
    pub fn parse(s: impl Into<String>) -> SnapshotResult<Self> {
        let s = s.into();
        if s.is_empty() || s.len() > 20 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SnapshotError::InvalidId(s));
        }
        Ok(Self(s))
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The millisecond timestamp this id encodes.
    pub fn millis(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// Next id strictly after `previous`, based on the current time.
    pub fn next_after(previous: Option<&SnapshotId>, now: DateTime<Utc>) -> Self {
        let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let floor = previous
            .and_then(SnapshotId::millis)
            .map(|ms| ms.saturating_add(1))
            .unwrap_or_default();
        Self::from_millis(now_ms.max(floor))
    }

    /// Capture time encoded in the id.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let ms = i64::try_from(self.millis()?).ok()?;
        Utc.timestamp_millis_opt(ms).single()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotId {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// SHA-256 of a file's uncompressed content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a byte buffer.
    pub fn of(content: &[u8]) -> Self {
        Self(Sha256::digest(content).into())
    }

    /// First two hex characters, used to shard the object pool.
    pub fn prefix(&self) -> String {
        format!("{:02x}", self.0[0])
    }

    /// Remaining 62 hex characters.
    pub fn suffix(&self) -> String {
        self.0[1..].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

impl FromStr for ContentHash {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(SnapshotError::Corrupted(format!("invalid content hash '{s}'")));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).unwrap_or_default();
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| SnapshotError::Corrupted(format!("invalid content hash '{s}'")))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// One file as recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: f64,
    /// POSIX permission bits.
    pub mode: u32,
    /// Hash of the content; the key of its blob in the object pool.
    pub hash: ContentHash,
    /// True when this snapshot captured this version of the file.
    pub stored: bool,
    /// Snapshot that captured this version, when `stored` is false.
    /// Always points straight at that snapshot, never at another reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<SnapshotId>,
}

impl FileEntry {
    /// Snapshot that captured this version, given the id of the manifest
    /// this entry belongs to.
    pub fn owner<'a>(&'a self, manifest_id: &'a SnapshotId) -> &'a SnapshotId {
        match (&self.reference, self.stored) {
            (Some(reference), false) => reference,
            _ => manifest_id,
        }
    }

    /// Whether a scanned file still looks like this entry.
    ///
    /// mtimes are compared to the microsecond; the JSON float round trip
    /// is not guaranteed to be bit-exact.
    pub fn matches_metadata(&self, size: u64, mtime: f64) -> bool {
        self.size == size && (self.mtime - mtime).abs() < MTIME_TOLERANCE
    }
}

/// Summary statistics of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStats {
    pub total_files: usize,
    pub changed_files: usize,
    /// Bytes written to the object pool by this snapshot.
    pub stored_size: u64,
}

/// Persisted description of one snapshot. Never modified once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotManifest {
    pub id: SnapshotId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Absolute path of the project this snapshot was taken from.
    #[serde(default)]
    pub project_path: PathBuf,
    pub files: Vec<FileEntry>,
    pub stats: ManifestStats,
}

impl SnapshotManifest {
    /// Look up an entry by relative path.
    pub fn entry(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Entries keyed by path.
    pub fn index(&self) -> HashMap<&str, &FileEntry> {
        self.files.iter().map(|f| (f.path.as_str(), f)).collect()
    }

    /// Lightweight view for listings.
    pub fn summary(&self) -> Snapshot {
        Snapshot {
            id: self.id.clone(),
            timestamp: self.timestamp,
            label: self.label.clone(),
            source: self.source.clone(),
            stats: self.stats,
        }
    }

    /// Read a manifest from `path`.
    ///
    /// A missing file maps to `ManifestNotFound`; a malformed one to
    /// `Serialization`.
    pub fn read_from(path: &Path, id: &SnapshotId) -> SnapshotResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::ManifestNotFound(id.to_string()));
            }
            Err(e) => return Err(SnapshotError::read(path, e)),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the manifest to `path` atomically.
    pub fn write_to(&self, path: &Path) -> SnapshotResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &json)
    }
}

/// Lightweight view of a snapshot, without its file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: SnapshotId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub stats: ManifestStats,
}

/// Write content to a file atomically via temp file + rename.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> SnapshotResult<()> {
    let parent = path.parent().ok_or_else(|| {
        SnapshotError::InvalidPath(format!("{} has no parent directory", path.display()))
    })?;
    std::fs::create_dir_all(parent).map_err(|e| SnapshotError::write(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{file_name}.tmp-{}", std::process::id()));

    let write_result = (|| -> SnapshotResult<()> {
        let mut file =
            std::fs::File::create(&temp_path).map_err(|e| SnapshotError::write(&temp_path, e))?;
        file.write_all(content)
            .map_err(|e| SnapshotError::write(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| SnapshotError::write(&temp_path, e))?;
        Ok(())
    })();

    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        SnapshotError::write(path, e)
    })
}
