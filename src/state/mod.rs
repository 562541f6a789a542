// Scan session state
//
// ScanSession holds the status of the most recent scan behind Arc<RwLock<T>>
// and broadcasts SessionEvents so a host can re-render without polling.

use crate::models::{CliOutput, ScanOptions};
use crate::services::ScanError;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanStatus {
    /// No scan attempted yet.
    #[default]
    Idle,
    /// At least one invocation is outstanding.
    Scanning,
    /// Most recent applied scan succeeded.
    Ready(Arc<CliOutput>),
    /// Most recent applied scan failed. Any earlier report is gone.
    Failed(ScanError),
}

impl ScanStatus {
    pub fn output(&self) -> Option<&Arc<CliOutput>> {
        match self {
            ScanStatus::Ready(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScanError> {
        match self {
            ScanStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanStatus::Scanning)
    }
}

/// Snapshot of the whole session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub status: ScanStatus,

    /// Recorded as soon as a scan starts, so a rescan can target it before
    /// the first scan has even finished.
    pub last_directory: Option<Utf8PathBuf>,
    pub last_options: Option<ScanOptions>,

    /// Sequence number handed to the most recent `begin_scan`.
    pub issued_seq: u64,
    /// Highest sequence number whose completion has been applied.
    pub applied_seq: u64,
}

impl SessionState {
    /// True while a started scan has not reported back.
    pub fn has_outstanding(&self) -> bool {
        self.issued_seq > self.applied_seq
    }
}

/// Proof that a scan was started, carried back to [`ScanSession::finish_scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanTicket {
    pub seq: u64,
}

/// Events broadcast on every transition.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    ScanStarted {
        seq: u64,
        directory: Utf8PathBuf,
    },

    ScanCompleted {
        seq: u64,
        duplicate_count: u64,
        total_space: u64,
    },

    ScanFailed {
        seq: u64,
        kind: &'static str,
        message: String,
    },

    /// A completion arrived after a newer one had already been applied.
    CompletionDiscarded {
        seq: u64,
        applied_seq: u64,
    },
}

/// Long-lived scan state machine.
///
/// `Idle -> Scanning -> Ready | Failed`, re-enterable from any state.
/// Every `begin_scan` gets a fresh, increasing sequence number; a completion
/// older than the newest applied one is dropped so a slow early scan can
/// never overwrite a faster later one.
pub struct ScanSession {
    state: Arc<RwLock<SessionState>>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl ScanSession {
    /// Create an idle session with a broadcast buffer of 100 events.
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            events_tx,
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.read(|s| s.clone())
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn status(&self) -> ScanStatus {
        self.read(|s| s.status.clone())
    }

    /// Directory and options of the most recently started scan.
    pub fn last_target(&self) -> Option<(Utf8PathBuf, ScanOptions)> {
        self.read(|s| match (&s.last_directory, &s.last_options) {
            (Some(dir), Some(options)) => Some((dir.clone(), options.clone())),
            _ => None,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Enter `Scanning` from any state and remember the target.
    pub fn begin_scan(&self, directory: &Utf8Path, options: &ScanOptions) -> ScanTicket {
        let seq = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.issued_seq += 1;
            state.status = ScanStatus::Scanning;
            state.last_directory = Some(directory.to_path_buf());
            state.last_options = Some(options.clone());
            state.issued_seq
        };

        tracing::info!("Scan #{} started for {}", seq, directory);
        self.emit(SessionEvent::ScanStarted {
            seq,
            directory: directory.to_path_buf(),
        });

        ScanTicket { seq }
    }

    /// Apply a scan result.
    ///
    /// Returns `false` if the completion was stale and left the state untouched.
    pub fn finish_scan(
        &self,
        ticket: ScanTicket,
        result: Result<Arc<CliOutput>, ScanError>,
    ) -> bool {
        let applied_seq = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if ticket.seq < state.applied_seq {
                Some(state.applied_seq)
            } else {
                state.applied_seq = ticket.seq;
                state.status = match &result {
                    Ok(output) => ScanStatus::Ready(Arc::clone(output)),
                    Err(err) => ScanStatus::Failed(err.clone()),
                };
                None
            }
        };

        if let Some(applied_seq) = applied_seq {
            tracing::warn!(
                "Discarding stale result of scan #{} (scan #{} already applied)",
                ticket.seq,
                applied_seq
            );
            self.emit(SessionEvent::CompletionDiscarded {
                seq: ticket.seq,
                applied_seq,
            });
            return false;
        }

        match result {
            Ok(output) => {
                tracing::info!(
                    "Scan #{} ready: {} groups, {} bytes recoverable",
                    ticket.seq,
                    output.duplicate_count,
                    output.total_space
                );
                self.emit(SessionEvent::ScanCompleted {
                    seq: ticket.seq,
                    duplicate_count: output.duplicate_count,
                    total_space: output.total_space,
                });
            }
            Err(err) => {
                tracing::error!("Scan #{} failed: {}", ticket.seq, err);
                self.emit(SessionEvent::ScanFailed {
                    seq: ticket.seq,
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }

        true
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events_tx.send(event);
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ScanSession {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            events_tx: self.events_tx.clone(),
        }
    }
}
