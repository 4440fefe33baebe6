//! Snapshot command handlers.
//!
//! Handles taking, restoring, deleting and pruning snapshots.

use chrono::Utc;
use histree_snapshot::SnapshotStore;
use std::path::Path;

/// Take a snapshot unless one was taken within the debounce interval.
pub async fn handle_snapshot(
    store: &SnapshotStore,
    project: &Path,
    label: Option<&str>,
    source: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    if !force && is_debounced(store, project).await? {
        println!(
            "Skipped: a snapshot was taken less than {}s ago (use --force to override)",
            store.config().debounce_secs
        );
        return Ok(());
    }

    let snapshot = store.create_snapshot(project, label, source).await?;
    println!(
        "Created snapshot {} ({} files, {} changed, {} stored)",
        snapshot.id,
        snapshot.stats.total_files,
        snapshot.stats.changed_files,
        bytesize::ByteSize(snapshot.stats.stored_size)
    );
    Ok(())
}

/// Debounce across processes: the in-memory gate only knows this run, so
/// the newest snapshot on disk counts as the last capture too.
async fn is_debounced(store: &SnapshotStore, project: &Path) -> anyhow::Result<bool> {
    if let Some(latest) = store.latest_snapshot(project).await? {
        let age = Utc::now()
            .signed_duration_since(latest.timestamp)
            .to_std()
            .unwrap_or_default();
        if age.as_secs() < store.config().debounce_secs {
            return Ok(true);
        }
    }
    Ok(!store.should_snapshot(project).await)
}

/// Restore a project to a snapshot.
pub async fn handle_restore(store: &SnapshotStore, project: &Path, id: &str) -> anyhow::Result<()> {
    let report = store.restore_snapshot(project, id).await?;
    println!(
        "Restored snapshot {}: {} files written, {} removed",
        report.snapshot.id, report.files_written, report.files_removed
    );
    println!("Previous state saved as snapshot {}", report.checkpoint.id);
    Ok(())
}

/// Delete one snapshot.
pub async fn handle_delete(store: &SnapshotStore, project: &Path, id: &str) -> anyhow::Result<()> {
    store.delete_snapshot(project, id).await?;
    println!("Deleted snapshot {id}");
    Ok(())
}

/// Keep the newest `keep` snapshots, falling back to the configured count.
pub async fn handle_cleanup(
    store: &SnapshotStore,
    project: &Path,
    keep: Option<usize>,
) -> anyhow::Result<()> {
    let keep = keep.unwrap_or(store.config().keep_count);
    let removed = store.cleanup(project, keep).await?;
    println!("Removed {removed} snapshot(s), keeping at most {keep}");
    Ok(())
}
