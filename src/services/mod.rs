//! Services module - the scan orchestration logic behind the host UI.
//!
//! Everything here is **framework-agnostic**: no rendering, no preference
//! storage, only the contract with the external `file-deduplicator` engine
//! and the host's trash capability.
//!
//! # Components
//!
//! - [`ScanInvoker`]: builds the engine's argument vector, runs it as a
//!   subprocess with a deadline and cancellation, caps captured output at
//!   [`MAX_OUTPUT_BYTES`] and classifies failures.
//! - [`parse_output`]: decodes the engine's JSON report and validates the
//!   duplicate-group invariants.
//! - [`DeletionCoordinator`]: trashes a single file, then rescans.
//! - [`format`]: size/filename formatting and notice text for hosts.
//!
//! # Engine Contract
//!
//! ```text
//! <engine> --dir <path> --json --recursive <true|false> --hash <sha256|md5|sha1> [--min-size <bytes>]
//! ```
//!
//! Exit code 0 with one JSON document on stdout is the only success path.
//! The engine runs with `_DEDUP_SPAWNED=1` in its environment.

pub mod deletion;
pub mod error;
pub mod format;
pub mod invoker;
pub mod parser;

pub use deletion::{DeletionCoordinator, DeletionOutcome, SystemTrash, Trash};
pub use error::{DeletionError, ScanError};
pub use format::{Notice, NoticeStyle, file_name, format_file_size, scan_notice};
pub use invoker::{
    Engine, MAX_ERROR_BYTES, MAX_OUTPUT_BYTES, SPAWN_MARKER_VAR, ScanInvoker, build_scan_args,
};
pub use parser::{parse_output, validate};
