//! Read-only history command handlers.

use bytesize::ByteSize;
use histree_snapshot::SnapshotStore;
use std::path::Path;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// List snapshots, newest first.
pub async fn handle_list(
    store: &SnapshotStore,
    project: &Path,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let snapshots = store.list_snapshots(project, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    if snapshots.is_empty() {
        println!("No snapshots found.");
        return Ok(());
    }

    println!(
        "{:<15} {:<20} {:>7} {:>8} {:>10}  {}",
        "ID", "TIME", "FILES", "CHANGED", "STORED", "LABEL"
    );
    println!("{}", "-".repeat(78));
    for snapshot in snapshots {
        let label = snapshot.label.as_deref().unwrap_or("");
        let label = if label.chars().count() > 24 {
            format!("{}...", label.chars().take(21).collect::<String>())
        } else {
            label.to_string()
        };
        println!(
            "{:<15} {:<20} {:>7} {:>8} {:>10}  {}",
            snapshot.id.as_str(),
            snapshot
                .timestamp
                .with_timezone(&chrono::Local)
                .format(TIME_FORMAT)
                .to_string(),
            snapshot.stats.total_files,
            snapshot.stats.changed_files,
            ByteSize(snapshot.stats.stored_size).to_string(),
            label
        );
    }
    Ok(())
}

/// Show one snapshot and its file list.
pub async fn handle_show(
    store: &SnapshotStore,
    project: &Path,
    id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let Some(manifest) = store.get_snapshot(project, id).await? else {
        anyhow::bail!("Snapshot not found: {id}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!("Snapshot: {}", manifest.id);
    println!(
        "Time: {}",
        manifest
            .timestamp
            .with_timezone(&chrono::Local)
            .format(TIME_FORMAT)
    );
    if let Some(label) = &manifest.label {
        println!("Label: {label}");
    }
    if let Some(source) = &manifest.source {
        println!("Source: {source}");
    }
    println!("Project: {}", manifest.project_path.display());
    println!(
        "Files: {} ({} changed, {} stored)",
        manifest.stats.total_files,
        manifest.stats.changed_files,
        ByteSize(manifest.stats.stored_size)
    );
    println!();
    for entry in &manifest.files {
        let origin = match (&entry.reference, entry.stored) {
            (Some(owner), false) => format!("from {owner}"),
            _ => "captured".to_string(),
        };
        println!(
            "  {:o} {:>10}  {}  ({})",
            entry.mode,
            ByteSize(entry.size).to_string(),
            entry.path,
            origin
        );
    }
    Ok(())
}

/// Show storage statistics for a project.
pub async fn handle_stats(store: &SnapshotStore, project: &Path) -> anyhow::Result<()> {
    let usage = store.storage_usage(project).await?;
    let latest = store.latest_snapshot(project).await?;

    println!("Project: {}", project.display());
    println!("Hash: {}", store.project_hash(project)?);
    println!("Snapshots: {}", usage.snapshot_count);
    if let Some(latest) = latest {
        println!("Latest: {}", latest.id);
    }
    println!("Manifests: {}", ByteSize(usage.manifest_bytes));
    println!("Objects: {}", ByteSize(usage.object_bytes));
    println!("Total: {}", ByteSize(usage.total()));
    Ok(())
}
