// dedup-companion - scan orchestration for the file-deduplicator engine
//
// This is the library crate: invocation, output parsing, the scan session
// state machine and deletion-triggered rescans. The binary crate (main.rs)
// is a small command-line host on top of it.

pub mod config;
pub mod controller;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use controller::ScanController;
pub use metrics::Metrics;
pub use models::{CliOutput, DuplicateGroup, FileInfo, HashAlgorithm, Preferences, ScanOptions};
pub use services::{DeletionCoordinator, DeletionError, ScanError, ScanInvoker};
pub use state::{ScanSession, ScanStatus, SessionEvent};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
