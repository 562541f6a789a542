// Scan and deletion counters
//
// Lock-free counters shared by the controller and the deletion coordinator,
// logged on shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Metrics {
    /// Engine invocations started
    pub scans_started: AtomicU64,

    /// Invocations that produced a valid report
    pub scans_completed: AtomicU64,

    /// Invocations that ended in any ScanError
    pub scans_failed: AtomicU64,

    /// Completions dropped because a newer scan had already been applied
    pub stale_completions: AtomicU64,

    /// Wall time spent waiting on the engine, in milliseconds
    pub total_scan_time_ms: AtomicU64,

    pub files_trashed: AtomicU64,

    pub deletion_failures: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scans_started: AtomicU64::new(0),
            scans_completed: AtomicU64::new(0),
            scans_failed: AtomicU64::new(0),
            stale_completions: AtomicU64::new(0),
            total_scan_time_ms: AtomicU64::new(0),
            files_trashed: AtomicU64::new(0),
            deletion_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_scan_started(&self) {
        self.scans_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one invocation and how long it took.
    pub fn record_scan_finished(&self, succeeded: bool, elapsed: Duration) {
        if succeeded {
            self.scans_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.scans_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_scan_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_stale_completion(&self) {
        self.stale_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_trashed(&self) {
        self.files_trashed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deletion_failure(&self) {
        self.deletion_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average engine time per finished scan, in milliseconds.
    pub fn avg_scan_time_ms(&self) -> f64 {
        let total = self.total_scan_time_ms.load(Ordering::Relaxed);
        let count = self.scans_completed.load(Ordering::Relaxed)
            + self.scans_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Scans: {} started, {} completed, {} failed, {} stale",
            self.scans_started.load(Ordering::Relaxed),
            self.scans_completed.load(Ordering::Relaxed),
            self.scans_failed.load(Ordering::Relaxed),
            self.stale_completions.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Engine time: {:.2}s (avg: {:.2}ms per scan)",
            self.total_scan_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_scan_time_ms()
        );
        tracing::info!(
            "Trash: {} moved, {} failed",
            self.files_trashed.load(Ordering::Relaxed),
            self.deletion_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
