// ScanController - sequences engine runs into the scan session
//
// The controller owns the preferences, the engine, the session and the
// cancellation channel. Hosts call `start`/`rescan` from their event loop
// and render from `session()` snapshots or its event stream.

use crate::metrics::Metrics;
use crate::models::{CliOutput, Preferences, ScanOptions};
use crate::services::{Engine, ScanError, ScanInvoker, parse_output};
use crate::state::ScanSession;
use camino::Utf8Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Drives scans against an [`Engine`] and records them in a [`ScanSession`].
///
/// No lock guards `start`: overlapping calls each run their own engine
/// process. The session's sequence numbers decide which result sticks.
pub struct ScanController<E: Engine = ScanInvoker> {
    session: ScanSession,
    engine: E,
    preferences: Preferences,

    /// Send `true` to cancel every scan in flight at that moment.
    cancel_tx: watch::Sender<bool>,

    metrics: Arc<Metrics>,
}

impl ScanController<ScanInvoker> {
    /// Controller backed by the real engine configured in `preferences`.
    pub fn from_preferences(preferences: Preferences) -> Self {
        let engine = ScanInvoker::new(&preferences);
        Self::new(engine, preferences)
    }
}

impl<E: Engine> ScanController<E> {
    pub fn new(engine: E, preferences: Preferences) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            session: ScanSession::new(),
            engine,
            preferences,
            cancel_tx,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Scan `directory` and apply the outcome to the session.
    ///
    /// The session enters `Scanning` (and records the target) before the
    /// engine is spawned. The caller always gets this invocation's own
    /// result, even when the session discards it as stale.
    pub async fn start(
        &self,
        directory: &Utf8Path,
        options: ScanOptions,
    ) -> Result<Arc<CliOutput>, ScanError> {
        // Subscribe first so a cancel sent from here on reaches this scan.
        let cancel_rx = self.cancel_tx.subscribe();
        let ticket = self.session.begin_scan(directory, &options);
        self.metrics.record_scan_started();

        let started = Instant::now();
        let result = self
            .engine
            .run(directory, &options, cancel_rx)
            .await
            .and_then(|raw| parse_output(&raw))
            .map(Arc::new);
        self.metrics
            .record_scan_finished(result.is_ok(), started.elapsed());

        if !self.session.finish_scan(ticket, result.clone()) {
            self.metrics.record_stale_completion();
        }

        result
    }

    /// Repeat the most recently started scan. `None` if nothing was scanned yet.
    pub async fn rescan(&self) -> Option<Result<Arc<CliOutput>, ScanError>> {
        let Some((directory, options)) = self.session.last_target() else {
            tracing::debug!("Rescan requested before any scan, ignoring");
            return None;
        };

        tracing::info!("Rescanning {}", directory);
        Some(self.start(&directory, options).await)
    }

    /// Scan the configured default folder, if there is one.
    pub async fn scan_default_location(&self) -> Option<Result<Arc<CliOutput>, ScanError>> {
        let location = self.preferences.default_location()?.to_string();
        let options = ScanOptions::from_preferences(&self.preferences);

        tracing::info!("Auto-scanning default location {}", location);
        Some(self.start(Utf8Path::new(&location), options).await)
    }

    /// Cancel every scan currently in flight. Later scans are unaffected.
    pub fn request_cancel(&self) {
        tracing::info!("Cancellation requested for in-flight scans");
        self.cancel_tx.send_replace(true);
    }
}
