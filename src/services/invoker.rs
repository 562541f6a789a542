use super::error::ScanError;
use crate::models::{Preferences, ScanOptions};
use camino::Utf8Path;
use std::future::Future;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::timeout;

/// Upper bound on captured engine stdout (10 MiB).
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How much engine stderr is kept for diagnostics. The rest is drained and dropped.
pub const MAX_ERROR_BYTES: usize = 64 * 1024;

/// Set in the engine's environment so it knows it was spawned programmatically.
pub const SPAWN_MARKER_VAR: &str = "_DEDUP_SPAWNED";

/// Anything that can turn a directory + options into raw engine output.
///
/// [`ScanInvoker`] is the production implementation. The controller is
/// generic over this trait so workflows can be driven without a real engine.
pub trait Engine: Send + Sync {
    /// Run one scan. A `true` sent on `cancel` after the call starts aborts it.
    fn run(
        &self,
        directory: &Utf8Path,
        options: &ScanOptions,
        cancel: watch::Receiver<bool>,
    ) -> impl Future<Output = Result<String, ScanError>> + Send;
}

/// Build the engine's argument vector.
///
/// `--dir <dir> --json --recursive <bool> --hash <algo> [--min-size <bytes>]`
pub fn build_scan_args(directory: &Utf8Path, options: &ScanOptions) -> Vec<String> {
    let mut args = vec![
        "--dir".to_string(),
        directory.to_string(),
        "--json".to_string(),
        "--recursive".to_string(),
        options.recursive.to_string(),
        "--hash".to_string(),
        options.algorithm.as_str().to_string(),
    ];

    if let Some(min_size) = options.min_size.filter(|&n| n > 0) {
        args.push("--min-size".to_string());
        args.push(min_size.to_string());
    }

    args
}

/// Runs the external engine and captures its output.
///
/// The engine path and deadline come from [`Preferences`] at construction.
#[derive(Debug, Clone)]
pub struct ScanInvoker {
    engine_path: String,
    deadline: Option<Duration>,
    output_limit: usize,
}

struct Captured {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ScanInvoker {
    pub fn new(preferences: &Preferences) -> Self {
        Self {
            engine_path: preferences.engine_path().to_string(),
            deadline: preferences.scan_deadline(),
            output_limit: MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    pub fn engine_path(&self) -> &str {
        &self.engine_path
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Execute the engine against `directory` and return its stdout.
    ///
    /// The child is spawned with `kill_on_drop`, so losing the race against
    /// cancellation, the deadline or the output limit terminates it.
    pub async fn invoke(
        &self,
        directory: &Utf8Path,
        options: &ScanOptions,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<String, ScanError> {
        let args = build_scan_args(directory, options);
        tracing::debug!("Invoking engine: {} {}", self.engine_path, args.join(" "));

        let start = Instant::now();

        let child = Command::new(&self.engine_path)
            .args(&args)
            .env(SPAWN_MARKER_VAR, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.classify_spawn_error(e))?;

        let run = collect_output(child, self.output_limit);
        let guarded = async {
            match self.deadline {
                Some(deadline) => timeout(deadline, run).await.map_err(|_| {
                    tracing::warn!("Engine timed out after {:?}, killing it", deadline);
                    ScanError::Timeout(deadline)
                })?,
                None => run.await,
            }
        };

        let captured = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                tracing::warn!("Scan of {} cancelled, killing engine", directory);
                return Err(ScanError::Cancelled);
            }
            result = guarded => result?,
        };

        tracing::info!(
            "Engine finished in {:.2}s with {} ({} bytes of output)",
            start.elapsed().as_secs_f32(),
            captured.status,
            captured.stdout.len()
        );

        interpret(captured)
    }

    fn classify_spawn_error(&self, err: io::Error) -> ScanError {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                tracing::error!("Engine not runnable at {}: {}", self.engine_path, err);
                ScanError::ExecutableNotFound {
                    path: self.engine_path.clone(),
                }
            }
            _ => ScanError::process(format!("failed to start {}: {}", self.engine_path, err)),
        }
    }
}

impl Engine for ScanInvoker {
    fn run(
        &self,
        directory: &Utf8Path,
        options: &ScanOptions,
        cancel: watch::Receiver<bool>,
    ) -> impl Future<Output = Result<String, ScanError>> + Send {
        self.invoke(directory, options, cancel)
    }
}

/// Resolves once `true` is sent after the receiver was created.
///
/// A dropped sender means nobody can cancel any more, so this never resolves.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *cancel.borrow_and_update() {
            return;
        }
    }
}

async fn collect_output(mut child: Child, limit: usize) -> Result<Captured, ScanError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ScanError::process("engine stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ScanError::process("engine stderr was not captured"))?;

    let (stdout, stderr) = tokio::try_join!(
        read_capped(stdout, limit),
        read_truncated(stderr, MAX_ERROR_BYTES)
    )?;

    let status = child
        .wait()
        .await
        .map_err(|e| ScanError::process(format!("failed to wait for engine: {e}")))?;

    Ok(Captured {
        status,
        stdout,
        stderr,
    })
}

/// Read the whole stream, failing as soon as it grows past `limit`.
async fn read_capped<R: AsyncRead + Unpin>(reader: R, limit: usize) -> Result<Vec<u8>, ScanError> {
    let mut buf = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| ScanError::process(format!("failed to read engine output: {e}")))?;

    if buf.len() > limit {
        tracing::warn!("Engine output exceeded {} bytes", limit);
        return Err(ScanError::OutputTooLarge { limit });
    }

    Ok(buf)
}

/// Drain the whole stream, keeping at most `limit` bytes.
async fn read_truncated<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> Result<Vec<u8>, ScanError> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| ScanError::process(format!("failed to read engine errors: {e}")))?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }

    Ok(kept)
}

fn interpret(captured: Captured) -> Result<String, ScanError> {
    let stdout_empty = captured.stdout.iter().all(u8::is_ascii_whitespace);
    let stderr = String::from_utf8_lossy(&captured.stderr).into_owned();
    let stderr_empty = stderr.trim().is_empty();

    if stdout_empty && !stderr_empty {
        tracing::warn!("Engine reported an error: {}", stderr.trim());
        return Err(ScanError::ProcessError { message: stderr });
    }

    if !captured.status.success() {
        return Err(ScanError::process(describe_exit(captured.status, &stderr)));
    }

    String::from_utf8(captured.stdout)
        .map_err(|e| ScanError::parse(format!("engine output is not valid UTF-8: {e}")))
}

fn describe_exit(status: ExitStatus, stderr: &str) -> String {
    let base = match status.code() {
        Some(code) => format!("engine exited with code {code}"),
        None => "engine was terminated by a signal".to_string(),
    };

    let detail = stderr.trim();
    if detail.is_empty() {
        base
    } else {
        format!("{base}: {detail}")
    }
}
