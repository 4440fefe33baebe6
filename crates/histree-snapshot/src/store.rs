//! Snapshot storage implementation.

use crate::codec::{Compressor, GzipCompressor};
use crate::config::SnapshotConfig;
use crate::ignore::IgnoreRules;
use crate::manifest::{
    ContentHash, FileEntry, ManifestStats, Snapshot, SnapshotId, SnapshotManifest, MANIFEST_FILE,
};
use crate::pool::{dir_size, ObjectPool};
use crate::scanner::{DirectoryScanner, ScannedFile};
use crate::{SnapshotError, SnapshotResult};
use chrono::{DateTime, Duration, Utc};
use histree_util::TimingGuard;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Label given to the checkpoint taken before every restore.
pub const PRE_RESTORE_LABEL: &str = "Pre-restore backup";

/// Source tag of the checkpoint taken before every restore.
pub const RESTORE_SOURCE: &str = "restore";

/// Outcome of a restore.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// The snapshot the tree now matches.
    pub snapshot: Snapshot,
    /// Checkpoint of the tree as it was before the restore.
    pub checkpoint: Snapshot,
    /// Manifest files written back into the tree.
    pub files_written: usize,
    /// Live files deleted because the snapshot does not name them.
    pub files_removed: usize,
}

/// Disk space used by one project's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    /// Snapshot directories on disk, readable or not.
    pub snapshot_count: usize,
    /// Bytes under `snapshots/`.
    pub manifest_bytes: u64,
    /// Bytes in the content pool.
    pub object_bytes: u64,
}

impl StorageUsage {
    /// Manifest and object bytes combined.
    pub fn total(&self) -> u64 {
        self.manifest_bytes + self.object_bytes
    }
}

#[derive(Default)]
struct StoreState {
    /// Last capture time per absolute project path.
    last_capture: HashMap<PathBuf, DateTime<Utc>>,
    /// One serialization lock per project hash.
    locks: HashMap<String, Arc<Mutex<()>>>,
    /// Retention passes spawned by `create_snapshot`.
    pending_cleanup: Vec<JoinHandle<()>>,
}

/// Storage locations of one project.
#[derive(Debug, Clone)]
struct Project {
    path: PathBuf,
    hash: String,
    dir: PathBuf,
}

impl Project {
    fn snapshots_dir(&self) -> PathBuf {
        self.dir.join("snapshots")
    }

    fn snapshot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.snapshots_dir().join(id.as_str())
    }

    fn manifest_path(&self, id: &SnapshotId) -> PathBuf {
        self.snapshot_dir(id).join(MANIFEST_FILE)
    }

    fn pool(&self) -> ObjectPool {
        ObjectPool::new(self.dir.join("objects"))
    }
}

/// Incremental snapshot store for project directories.
///
/// Storage is partitioned per project:
/// ```text
/// root/
///   config.json                           # optional
///   history/projects/<project-hash>/
///     snapshots/<snapshot-id>/manifest.json
///     objects/<hh>/<hex>.gz | .raw        # content-addressed blobs
/// ```
///
/// Operations on the same project are serialized; different projects run
/// concurrently. Blocking filesystem work runs on tokio's blocking pool.
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    config: SnapshotConfig,
    scanner: DirectoryScanner,
    compressor: Arc<dyn Compressor>,
    state: Arc<Mutex<StoreState>>,
}

impl SnapshotStore {
    /// Create a store rooted at `root` with an explicit configuration.
    ///
    /// Nothing is written until the first snapshot is taken.
    pub fn new(root: impl Into<PathBuf>, config: SnapshotConfig) -> Self {
        let scanner = DirectoryScanner::new(IgnoreRules::from_config(&config));
        let compressor = Arc::new(GzipCompressor::new(config.effective_compression_level()));
        Self {
            root: root.into(),
            config,
            scanner,
            compressor,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    /// Create a store rooted at `root`, loading `root/config.json` and
    /// `HISTREE_*` overrides.
    pub async fn open(root: impl Into<PathBuf>) -> SnapshotResult<Self> {
        let root = root.into();
        let config = SnapshotConfig::load(&root).await?;
        Ok(Self::new(root, config))
    }

    /// Replace the blob codec.
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Stable namespace hash of a project path.
    pub fn project_hash(&self, project_path: &Path) -> SnapshotResult<String> {
        Ok(self.resolve(project_path)?.hash)
    }

    /// Whether the caller should take a snapshot of `project_path` now.
    ///
    /// Returns false if a snapshot was taken, or advised, within the
    /// debounce interval. A true answer is recorded, so a second call
    /// inside the window returns false.
    pub async fn should_snapshot(&self, project_path: &Path) -> bool {
        let key = histree_util::path::absolute(project_path)
            .unwrap_or_else(|_| project_path.to_path_buf());
        let now = Utc::now();
        let window = std::time::Duration::from_secs(self.config.debounce_secs);

        let mut state = self.state.lock().await;
        if let Some(last) = state.last_capture.get(&key) {
            let elapsed = now.signed_duration_since(*last).to_std().unwrap_or_default();
            if elapsed < window {
                debug!(project = %key.display(), ?elapsed, "Snapshot debounced");
                return false;
            }
        }
        state.last_capture.insert(key, now);
        true
    }

    /// Capture the current state of `project_path`.
    pub async fn create_snapshot(
        &self,
        project_path: &Path,
        label: Option<&str>,
        source: Option<&str>,
    ) -> SnapshotResult<Snapshot> {
        self.create_snapshot_with_cancel(project_path, label, source, &CancellationToken::new())
            .await
    }

    /// Like [`create_snapshot`](Self::create_snapshot), stopping with
    /// `Cancelled` once `cancel` fires. A cancelled capture writes no manifest.
    pub async fn create_snapshot_with_cancel(
        &self,
        project_path: &Path,
        label: Option<&str>,
        source: Option<&str>,
        cancel: &CancellationToken,
    ) -> SnapshotResult<Snapshot> {
        if !self.config.enabled {
            return Err(SnapshotError::config("snapshots are disabled"));
        }

        let project = self.resolve(project_path)?;
        let _timing = TimingGuard::snapshot(project.hash.clone());

        let lock = self.project_lock(&project.hash).await;
        let guard = lock.lock().await;
        let manifest = self
            .capture(
                &project,
                label.map(str::to_string),
                source.map(str::to_string),
                cancel,
            )
            .await?;
        drop(guard);

        self.record_capture(&project.path, manifest.timestamp).await;
        if self.config.auto_cleanup {
            self.schedule_cleanup(project).await;
        }

        Ok(manifest.summary())
    }

    /// List up to `limit` snapshots of a project, newest first.
    ///
    /// Snapshots whose manifest is missing or unreadable are skipped.
    pub async fn list_snapshots(
        &self,
        project_path: &Path,
        limit: usize,
    ) -> SnapshotResult<Vec<Snapshot>> {
        let project = self.resolve(project_path)?;
        blocking(move || {
            let mut snapshots = Vec::new();
            for id in list_ids(&project)? {
                if snapshots.len() >= limit {
                    break;
                }
                match SnapshotManifest::read_from(&project.manifest_path(&id), &id) {
                    Ok(manifest) => snapshots.push(manifest.summary()),
                    Err(e) => warn!(
                        project = %project.hash,
                        snapshot = %id,
                        error = %e,
                        "Skipping unreadable snapshot"
                    ),
                }
            }
            Ok(snapshots)
        })
        .await
    }

    /// Load the full manifest of one snapshot, or `None` if it does not exist.
    pub async fn get_snapshot(
        &self,
        project_path: &Path,
        snapshot_id: &str,
    ) -> SnapshotResult<Option<SnapshotManifest>> {
        let id = SnapshotId::parse(snapshot_id)?;
        let project = self.resolve(project_path)?;
        blocking(
            move || match SnapshotManifest::read_from(&project.manifest_path(&id), &id) {
                Ok(manifest) => Ok(Some(manifest)),
                Err(SnapshotError::ManifestNotFound(_)) => Ok(None),
                Err(e) => Err(e),
            },
        )
        .await
    }

    /// Most recent readable snapshot of a project.
    pub async fn latest_snapshot(&self, project_path: &Path) -> SnapshotResult<Option<Snapshot>> {
        Ok(self.list_snapshots(project_path, 1).await?.into_iter().next())
    }

    /// Make `project_path` match a snapshot exactly.
    pub async fn restore_snapshot(
        &self,
        project_path: &Path,
        snapshot_id: &str,
    ) -> SnapshotResult<RestoreReport> {
        self.restore_snapshot_with_cancel(project_path, snapshot_id, &CancellationToken::new())
            .await
    }

    /// Like [`restore_snapshot`](Self::restore_snapshot), stopping with
    /// `Cancelled` once `cancel` fires.
    ///
    /// A checkpoint of the current tree is always taken first. Files are
    /// then written in manifest order and files absent from the manifest
    /// are deleted. There is no rollback: a failure or cancellation part
    /// way through leaves the tree partially restored.
    pub async fn restore_snapshot_with_cancel(
        &self,
        project_path: &Path,
        snapshot_id: &str,
        cancel: &CancellationToken,
    ) -> SnapshotResult<RestoreReport> {
        let id = SnapshotId::parse(snapshot_id)?;
        let project = self.resolve(project_path)?;
        let _timing = TimingGuard::restore(project.hash.clone());

        let lock = self.project_lock(&project.hash).await;
        let guard = lock.lock().await;

        let checkpoint = self
            .capture(
                &project,
                Some(PRE_RESTORE_LABEL.to_string()),
                Some(RESTORE_SOURCE.to_string()),
                cancel,
            )
            .await?;
        self.record_capture(&project.path, checkpoint.timestamp).await;
        debug!(project = %project.hash, checkpoint = %checkpoint.id, "Took pre-restore checkpoint");

        let scanner = self.scanner.clone();
        let compressor = Arc::clone(&self.compressor);
        let cancel = cancel.clone();
        let target = project.clone();
        let (manifest, files_written, files_removed) = blocking(move || {
            let manifest = load_target(&target, &id)?;
            let (written, removed) =
                apply_manifest(&target, &manifest, &scanner, compressor.as_ref(), &cancel)?;
            Ok((manifest, written, removed))
        })
        .await?;
        drop(guard);

        info!(
            project = %project.hash,
            snapshot = %manifest.id,
            written = files_written,
            removed = files_removed,
            "Restored snapshot"
        );

        if self.config.auto_cleanup {
            self.schedule_cleanup(project).await;
        }

        Ok(RestoreReport {
            snapshot: manifest.summary(),
            checkpoint: checkpoint.summary(),
            files_written,
            files_removed,
        })
    }

    /// Delete one snapshot and collect blobs no other snapshot uses.
    pub async fn delete_snapshot(
        &self,
        project_path: &Path,
        snapshot_id: &str,
    ) -> SnapshotResult<()> {
        let id = SnapshotId::parse(snapshot_id)?;
        let project = self.resolve(project_path)?;

        let lock = self.project_lock(&project.hash).await;
        let _guard = lock.lock().await;

        blocking(move || {
            let dir = project.snapshot_dir(&id);
            if !dir.is_dir() {
                return Err(SnapshotError::not_found(id.as_str()));
            }
            fs::remove_dir_all(&dir).map_err(|e| SnapshotError::write(&dir, e))?;
            info!(project = %project.hash, snapshot = %id, "Deleted snapshot");
            collect_garbage(&project)?;
            Ok(())
        })
        .await
    }

    /// Keep the `keep_count` newest snapshots and delete the rest.
    ///
    /// Returns the number of snapshots deleted.
    pub async fn cleanup(&self, project_path: &Path, keep_count: usize) -> SnapshotResult<usize> {
        let project = self.resolve(project_path)?;
        self.prune(project, Some(keep_count), None).await
    }

    /// Delete snapshots captured more than `max_age` ago.
    ///
    /// Returns the number of snapshots deleted.
    pub async fn cleanup_older_than(
        &self,
        project_path: &Path,
        max_age: Duration,
    ) -> SnapshotResult<usize> {
        let project = self.resolve(project_path)?;
        match Utc::now().checked_sub_signed(max_age) {
            Some(cutoff) => self.prune(project, None, Some(cutoff)).await,
            None => Ok(0),
        }
    }

    /// Disk space used by a project's history.
    pub async fn storage_usage(&self, project_path: &Path) -> SnapshotResult<StorageUsage> {
        let project = self.resolve(project_path)?;
        blocking(move || {
            Ok(StorageUsage {
                snapshot_count: list_ids(&project)?.len(),
                manifest_bytes: dir_size(&project.snapshots_dir())?,
                object_bytes: project.pool().usage()?,
            })
        })
        .await
    }

    /// Wait for every background retention pass spawned so far.
    pub async fn wait_for_cleanup(&self) {
        let handles = std::mem::take(&mut self.state.lock().await.pending_cleanup);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background cleanup task failed");
            }
        }
    }

    fn resolve(&self, project_path: &Path) -> SnapshotResult<Project> {
        let path = histree_util::path::absolute(project_path)
            .map_err(|e| SnapshotError::read(project_path, e))?;
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let hash: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
        let dir = self.root.join("history").join("projects").join(&hash);
        Ok(Project { path, hash, dir })
    }

    async fn project_lock(&self, hash: &str) -> Arc<Mutex<()>> {
        let mut state = self.state.lock().await;
        Arc::clone(state.locks.entry(hash.to_string()).or_default())
    }

    async fn record_capture(&self, project_path: &Path, at: DateTime<Utc>) {
        self.state
            .lock()
            .await
            .last_capture
            .insert(project_path.to_path_buf(), at);
    }

    /// Scan, diff and persist a new manifest. The project lock must be held.
    async fn capture(
        &self,
        project: &Project,
        label: Option<String>,
        source: Option<String>,
        cancel: &CancellationToken,
    ) -> SnapshotResult<SnapshotManifest> {
        let project = project.clone();
        let scanner = self.scanner.clone();
        let compressor = Arc::clone(&self.compressor);
        let verify_content = self.config.verify_content;
        let cancel = cancel.clone();

        blocking(move || {
            capture_manifest(
                &project,
                &scanner,
                compressor.as_ref(),
                verify_content,
                label,
                source,
                &cancel,
            )
        })
        .await
    }

    async fn prune(
        &self,
        project: Project,
        keep: Option<usize>,
        cutoff: Option<DateTime<Utc>>,
    ) -> SnapshotResult<usize> {
        let _timing = TimingGuard::cleanup(project.hash.clone());
        let lock = self.project_lock(&project.hash).await;
        let _guard = lock.lock().await;
        blocking(move || prune_snapshots(&project, keep, cutoff)).await
    }

    async fn schedule_cleanup(&self, project: Project) {
        let store = self.clone();
        let keep = (self.config.keep_count > 0).then_some(self.config.keep_count);
        let max_age = self.config.max_age_days.map(|days| Duration::days(i64::from(days)));

        let handle = tokio::spawn(async move {
            let cutoff = max_age.and_then(|age| Utc::now().checked_sub_signed(age));
            let hash = project.hash.clone();
            match store.prune(project, keep, cutoff).await {
                Ok(0) => {}
                Ok(removed) => debug!(project = %hash, removed, "Background cleanup finished"),
                Err(e) => warn!(project = %hash, error = %e, "Background cleanup failed"),
            }
        });

        let mut state = self.state.lock().await;
        state.pending_cleanup.retain(|h| !h.is_finished());
        state.pending_cleanup.push(handle);
    }
}

async fn blocking<T, F>(f: F) -> SnapshotResult<T>
where
    F: FnOnce() -> SnapshotResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Snapshot ids of a project, newest first.
fn list_ids(project: &Project) -> SnapshotResult<Vec<SnapshotId>> {
    let dir = project.snapshots_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SnapshotError::read(&dir, e)),
    };

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SnapshotError::read(&dir, e))?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        if let Ok(id) = SnapshotId::parse(entry.file_name().to_string_lossy()) {
            ids.push(id);
        }
    }
    ids.sort_unstable_by(|a, b| b.cmp(a));
    Ok(ids)
}

fn capture_manifest(
    project: &Project,
    scanner: &DirectoryScanner,
    compressor: &dyn Compressor,
    verify_content: bool,
    label: Option<String>,
    source: Option<String>,
    cancel: &CancellationToken,
) -> SnapshotResult<SnapshotManifest> {
    let ids = list_ids(project)?;
    let previous = ids.iter().find_map(|id| {
        match SnapshotManifest::read_from(&project.manifest_path(id), id) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(
                    project = %project.hash,
                    snapshot = %id,
                    error = %e,
                    "Ignoring unreadable snapshot"
                );
                None
            }
        }
    });
    let previous_index = previous.as_ref().map(|m| m.index()).unwrap_or_default();

    let files = scanner.scan_cancellable(&project.path, cancel)?;
    let pool = project.pool();
    let timestamp = Utc::now();
    let id = SnapshotId::next_after(ids.first(), timestamp);

    let mut entries = Vec::with_capacity(files.len());
    let mut stats = ManifestStats {
        total_files: files.len(),
        ..Default::default()
    };

    for file in &files {
        if cancel.is_cancelled() {
            return Err(SnapshotError::Cancelled);
        }

        let mut content = None;
        let unchanged = match (previous.as_ref(), previous_index.get(file.relative_path.as_str())) {
            (Some(prev_manifest), Some(prev)) if prev.matches_metadata(file.size, file.mtime) => {
                if verify_content {
                    let bytes = read_scanned(file)?;
                    let same = ContentHash::of(&bytes) == prev.hash;
                    content = Some(bytes);
                    same.then(|| (prev, prev_manifest.id.clone()))
                } else {
                    Some((prev, prev_manifest.id.clone()))
                }
            }
            _ => None,
        };

        let entry = match unchanged {
            Some((prev, prev_id)) => FileEntry {
                path: file.relative_path.clone(),
                size: prev.size,
                mtime: file.mtime,
                mode: file.mode,
                hash: prev.hash,
                stored: false,
                reference: Some(prev.owner(&prev_id).clone()),
            },
            None => {
                let bytes = match content {
                    Some(bytes) => bytes,
                    None => read_scanned(file)?,
                };
                let hash = ContentHash::of(&bytes);
                stats.stored_size += pool.put(&hash, &bytes, compressor)?;
                stats.changed_files += 1;
                FileEntry {
                    path: file.relative_path.clone(),
                    size: bytes.len() as u64,
                    mtime: file.mtime,
                    mode: file.mode,
                    hash,
                    stored: true,
                    reference: None,
                }
            }
        };
        entries.push(entry);
    }

    if cancel.is_cancelled() {
        return Err(SnapshotError::Cancelled);
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let manifest = SnapshotManifest {
        id,
        timestamp,
        label,
        source,
        project_path: project.path.clone(),
        files: entries,
        stats,
    };
    manifest.write_to(&project.manifest_path(&manifest.id))?;

    info!(
        project = %project.hash,
        snapshot = %manifest.id,
        files = stats.total_files,
        changed = stats.changed_files,
        stored_bytes = stats.stored_size,
        "Created snapshot"
    );
    Ok(manifest)
}

fn read_scanned(file: &ScannedFile) -> SnapshotResult<Vec<u8>> {
    fs::read(&file.absolute_path).map_err(|e| SnapshotError::read(&file.absolute_path, e))
}

fn load_target(project: &Project, id: &SnapshotId) -> SnapshotResult<SnapshotManifest> {
    if !project.snapshot_dir(id).is_dir() {
        return Err(SnapshotError::not_found(id.as_str()));
    }
    SnapshotManifest::read_from(&project.manifest_path(id), id)
}

/// Write every manifest file, then delete live files the manifest does not name.
///
/// Returns `(files_written, files_removed)`.
fn apply_manifest(
    project: &Project,
    manifest: &SnapshotManifest,
    scanner: &DirectoryScanner,
    compressor: &dyn Compressor,
    cancel: &CancellationToken,
) -> SnapshotResult<(usize, usize)> {
    let pool = project.pool();
    let mut written = 0;

    for entry in &manifest.files {
        if cancel.is_cancelled() {
            return Err(SnapshotError::Cancelled);
        }

        let target = histree_util::path::safe_join(&project.path, Path::new(&entry.path))
            .ok_or_else(|| SnapshotError::InvalidPath(entry.path.clone()))?;
        let content = pool
            .get(&entry.hash, entry.size, compressor)?
            .ok_or_else(|| SnapshotError::FileNotFound(entry.path.clone()))?;

        prepare_target(&project.path, &target)?;
        crate::manifest::atomic_write(&target, &content)?;
        apply_mode(&target, entry.mode)?;
        written += 1;
    }

    let keep: HashSet<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    let mut removed = 0;
    for file in scanner.scan_cancellable(&project.path, cancel)? {
        if keep.contains(file.relative_path.as_str()) {
            continue;
        }
        match fs::remove_file(&file.absolute_path) {
            Ok(()) => {
                removed += 1;
                remove_empty_parents(&project.path, &file.absolute_path);
            }
            Err(e) => {
                warn!(path = %file.absolute_path.display(), error = %e, "Failed to remove file during restore")
            }
        }
    }

    Ok((written, removed))
}

/// Make every ancestor of `target` below `root` a real directory and clear
/// a directory sitting where `target` should be.
///
/// Symlinks and files in the way are unlinked, never followed. None of them
/// can be recorded content since the manifest names `target` itself.
fn prepare_target(root: &Path, target: &Path) -> SnapshotResult<()> {
    let relative = target
        .strip_prefix(root)
        .map_err(|_| SnapshotError::InvalidPath(target.display().to_string()))?;

    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        current.push(component);
        let is_target = components.peek().is_none();

        match fs::symlink_metadata(&current) {
            Ok(meta) if is_target => {
                // Anything but a real directory is replaced by the rename.
                if meta.is_dir() {
                    debug!(path = %current.display(), "Replacing directory with restored file");
                    fs::remove_dir_all(&current).map_err(|e| SnapshotError::write(&current, e))?;
                }
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                debug!(path = %current.display(), "Replacing non-directory with restored directory");
                fs::remove_file(&current).map_err(|e| SnapshotError::write(&current, e))?;
                fs::create_dir(&current).map_err(|e| SnapshotError::write(&current, e))?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !is_target {
                    fs::create_dir(&current).map_err(|e| SnapshotError::write(&current, e))?;
                }
            }
            Err(e) => return Err(SnapshotError::read(&current, e)),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> SnapshotResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| SnapshotError::write(path, e))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> SnapshotResult<()> {
    Ok(())
}

/// Remove now-empty directories between `file` and `root`, exclusive.
fn remove_empty_parents(root: &Path, file: &Path) {
    let mut dir = file.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}

fn prune_snapshots(
    project: &Project,
    keep: Option<usize>,
    cutoff: Option<DateTime<Utc>>,
) -> SnapshotResult<usize> {
    let mut removed = 0;
    let mut listable = 0;
    for id in &list_ids(project)? {
        // Unreadable directories are never listed, so they hold no keep slot.
        let readable = SnapshotManifest::read_from(&project.manifest_path(id), id).is_ok();
        let beyond_keep = keep.is_some_and(|k| listable >= k);
        if readable && !beyond_keep {
            listable += 1;
        }
        let too_old = cutoff.is_some_and(|c| id.timestamp().is_some_and(|t| t < c));
        if !(beyond_keep || too_old) {
            continue;
        }

        let dir = project.snapshot_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(project = %project.hash, snapshot = %id, "Removed snapshot");
                removed += 1;
            }
            Err(e) => warn!(
                project = %project.hash,
                snapshot = %id,
                error = %e,
                "Failed to remove snapshot"
            ),
        }
    }

    if removed > 0 {
        info!(project = %project.hash, removed, "Cleaned up snapshots");
    }
    collect_garbage(project)?;
    Ok(removed)
}

/// Remove blobs that no remaining manifest references.
///
/// Skipped entirely when any remaining manifest cannot be read.
fn collect_garbage(project: &Project) -> SnapshotResult<usize> {
    let mut live = HashSet::new();
    for id in list_ids(project)? {
        match SnapshotManifest::read_from(&project.manifest_path(&id), &id) {
            Ok(manifest) => live.extend(manifest.files.iter().map(|f| f.hash)),
            Err(e) => {
                warn!(
                    project = %project.hash,
                    snapshot = %id,
                    error = %e,
                    "Skipping blob collection, a manifest is unreadable"
                );
                return Ok(0);
            }
        }
    }
    project.pool().sweep(&live)
}
