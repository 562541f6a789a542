//! Data models for the scan front-end.
//!
//! - [`Preferences`]: host-supplied settings (engine path, default folder, hash algorithm)
//! - [`ScanOptions`]: per-scan knobs forwarded to the engine
//! - [`CliOutput`], [`DuplicateGroup`], [`FileInfo`]: the engine's JSON report
//!
//! Reports are built fresh by the parser on every successful scan and shared
//! read-only (behind an `Arc`) by [`ScanSession`](crate::state::ScanSession)
//! until the next scan supersedes them.

pub mod preferences;
pub mod scan;

pub use preferences::{DEFAULT_ENGINE, HashAlgorithm, Preferences};
pub use scan::{CliOutput, ConfigSnapshot, DuplicateGroup, FileInfo, ScanOptions};
