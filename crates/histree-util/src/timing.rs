//! RAII-based timing utilities for measuring and logging operation durations.
//!
//! # Example
//!
//! ```rust,ignore
//! use histree_util::timing::TimingGuard;
//!
//! fn capture(project: &str) {
//!     let _timing = TimingGuard::snapshot(project);
//!     // ... scan, diff, store ...
//!     // Duration is logged when _timing is dropped
//! }
//! ```

use std::time::Instant;
use tracing::{debug, info, warn};

/// RAII guard that measures and logs the duration of an operation.
///
/// When dropped, logs the elapsed time since creation at a level chosen by
/// how long the operation took.
pub struct TimingGuard {
    /// Kind of operation ("snapshot", "restore", "cleanup").
    operation_type: &'static str,
    /// What the operation ran against, usually a project hash.
    target: String,
    start: Instant,
    /// Minimum duration to log at info level (below this uses debug)
    info_threshold_ms: u64,
    /// Minimum duration to log at warn level
    warn_threshold_ms: u64,
}

impl TimingGuard {
    /// Create a new timing guard.
    pub fn new(operation_type: &'static str, target: impl Into<String>) -> Self {
        let target = target.into();
        debug!(operation_type, target = %target, "Starting operation");
        Self {
            operation_type,
            target,
            start: Instant::now(),
            info_threshold_ms: 100,
            warn_threshold_ms: 5000,
        }
    }

    /// Create a timing guard for snapshot capture.
    pub fn snapshot(target: impl Into<String>) -> Self {
        Self::new("snapshot", target)
    }

    /// Create a timing guard for a restore.
    pub fn restore(target: impl Into<String>) -> Self {
        Self::new("restore", target)
    }

    /// Create a timing guard for a retention pass.
    pub fn cleanup(target: impl Into<String>) -> Self {
        Self::new("cleanup", target)
    }

    /// Get the elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

fn format_duration(duration_ms: u128) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else if duration_ms < 60_000 {
        format!("{:.2}s", duration_ms as f64 / 1000.0)
    } else {
        let mins = duration_ms / 60_000;
        let secs = (duration_ms % 60_000) as f64 / 1000.0;
        format!("{mins}m {secs:.1}s")
    }
}

impl Drop for TimingGuard {
    #[allow(clippy::cognitive_complexity)]
    fn drop(&mut self) {
        let duration_ms = self.elapsed_ms();
        let duration = format_duration(duration_ms);

        if duration_ms >= self.warn_threshold_ms as u128 {
            warn!(
                operation_type = self.operation_type,
                target = %self.target,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Slow operation completed"
            );
        } else if duration_ms >= self.info_threshold_ms as u128 {
            info!(
                operation_type = self.operation_type,
                target = %self.target,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Operation completed"
            );
        } else {
            debug!(
                operation_type = self.operation_type,
                target = %self.target,
                duration_ms = duration_ms as u64,
                duration = %duration,
                "Operation completed"
            );
        }
    }
}
