//! histree - project directory history.
//!
//! This is the main entry point for the histree CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::*;
use histree_snapshot::SnapshotStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "histree")]
#[command(author, version, about = "Snapshot and restore project directories", long_about = None)]
struct Cli {
    /// Storage root (defaults to the platform data directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to a file instead of stderr (defaults to the data directory)
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1, require_equals = true)]
    log_file: Option<Option<PathBuf>>,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a snapshot of a project
    Snapshot {
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
        /// Label stored with the snapshot
        #[arg(short, long)]
        label: Option<String>,
        /// Tag describing what triggered the snapshot
        #[arg(short, long)]
        source: Option<String>,
        /// Snapshot even if one was taken within the debounce interval
        #[arg(short, long)]
        force: bool,
    },
    /// List snapshots, newest first
    List {
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
        /// Maximum number of snapshots to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Print output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one snapshot and its files
    Show {
        /// Snapshot ID
        id: String,
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
        /// Print the full manifest as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a project to a snapshot
    Restore {
        /// Snapshot ID
        id: String,
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
    },
    /// Delete a snapshot
    Delete {
        /// Snapshot ID
        id: String,
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
    },
    /// Delete all but the newest snapshots
    Cleanup {
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
        /// Number of snapshots to keep (defaults to the configured keep count)
        #[arg(short, long)]
        keep: Option<usize>,
    },
    /// Show storage statistics for a project
    Stats {
        /// Project directory (defaults to the current directory)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(Some(path)) => Some(path),
        Some(None) => histree_util::log::default_log_path(),
        None => None,
    };
    init_logging(cli.verbose, log_file);

    let root = match cli.root {
        Some(root) => root,
        None => histree_util::path::data_dir().ok_or_else(|| {
            anyhow::anyhow!("Could not determine the data directory; pass --root")
        })?,
    };
    let store = SnapshotStore::open(&root).await?;
    tracing::debug!(root = %root.display(), "Opened snapshot store");

    let cwd = std::env::current_dir()?;
    let project = |path: Option<PathBuf>| path.unwrap_or_else(|| cwd.clone());

    let result = match cli.command {
        Commands::Snapshot {
            path,
            label,
            source,
            force,
        } => {
            handle_snapshot(
                &store,
                &project(path),
                label.as_deref(),
                source.as_deref(),
                force,
            )
            .await
        }
        Commands::List { path, limit, json } => {
            handle_list(&store, &project(path), limit, json).await
        }
        Commands::Show { id, path, json } => handle_show(&store, &project(path), &id, json).await,
        Commands::Restore { id, path } => handle_restore(&store, &project(path), &id).await,
        Commands::Delete { id, path } => handle_delete(&store, &project(path), &id).await,
        Commands::Cleanup { path, keep } => handle_cleanup(&store, &project(path), keep).await,
        Commands::Stats { path } => handle_stats(&store, &project(path)).await,
    };

    // Let retention passes spawned by this command finish before exiting.
    store.wait_for_cleanup().await;

    result
}
