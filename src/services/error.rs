use std::time::Duration;
use thiserror::Error;

/// Errors that end a scan attempt.
///
/// The `Display` text is the message shown to the user, so each variant
/// tells apart a misconfigured engine path, an engine-side failure and
/// unreadable engine output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error(
        "file-deduplicator CLI not found at '{path}'. Please install it or set the correct path in preferences."
    )]
    ExecutableNotFound { path: String },

    #[error("CLI error: {message}")]
    ProcessError { message: String },

    #[error("CLI output exceeded the {limit} byte limit")]
    OutputTooLarge { limit: usize },

    #[error("Could not read CLI output: {message}")]
    ParseError { message: String },

    #[error("Scan timed out after {0:?}")]
    Timeout(Duration),

    #[error("Scan cancelled")]
    Cancelled,
}

impl ScanError {
    pub fn process(message: impl Into<String>) -> Self {
        ScanError::ProcessError {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ScanError::ParseError {
            message: message.into(),
        }
    }

    /// Short stable label, used in logs and session events.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::ExecutableNotFound { .. } => "executable_not_found",
            ScanError::ProcessError { .. } => "process_error",
            ScanError::OutputTooLarge { .. } => "output_too_large",
            ScanError::ParseError { .. } => "parse_error",
            ScanError::Timeout(_) => "timeout",
            ScanError::Cancelled => "cancelled",
        }
    }
}

/// Errors from moving a file to the trash. These never touch scan state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeletionError {
    #[error("Failed to move {path} to trash: {message}")]
    Trash { path: String, message: String },

    #[error("Trash request interrupted: {0}")]
    Interrupted(String),
}
