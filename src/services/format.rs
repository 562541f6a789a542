//! Display helpers shared by hosts rendering scan results.

use crate::models::{CliOutput, DuplicateGroup};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable byte size using 1024-based units.
///
/// Whole bytes carry no decimals; every larger unit carries one.
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, SIZE_UNITS[0])
    } else {
        format!("{:.1} {}", size, SIZE_UNITS[unit])
    }
}

/// Last `/`-separated component of `path`, or the whole path if that is empty.
pub fn file_name(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}

/// Section title for a group, numbered from 1.
pub fn group_title(index: usize, group: &DuplicateGroup) -> String {
    format!("Group {} - {} each", index + 1, format_file_size(group.size))
}

pub fn group_subtitle(group: &DuplicateGroup) -> String {
    format!("{} files", group.files.len())
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeStyle {
    Progress,
    Success,
    Failure,
}

/// A short message for the host's toast/notification surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub style: NoticeStyle,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn scanning(directory: &str) -> Self {
        Self {
            style: NoticeStyle::Progress,
            title: "Scanning for duplicates".to_string(),
            message: format!("Checking {directory}..."),
        }
    }

    pub fn scan_failed(error: &impl ToString) -> Self {
        Self {
            style: NoticeStyle::Failure,
            title: "Scan failed".to_string(),
            message: error.to_string(),
        }
    }

    pub fn trashed(path: &str) -> Self {
        Self {
            style: NoticeStyle::Success,
            title: "Moved to trash".to_string(),
            message: file_name(path).to_string(),
        }
    }

    pub fn delete_failed(error: &impl ToString) -> Self {
        Self {
            style: NoticeStyle::Failure,
            title: "Failed to delete".to_string(),
            message: error.to_string(),
        }
    }
}

/// Completion notice summarizing a report.
pub fn scan_notice(output: &CliOutput) -> Notice {
    if output.duplicate_count == 0 {
        Notice {
            style: NoticeStyle::Success,
            title: "No duplicates found".to_string(),
            message: "Your files are unique!".to_string(),
        }
    } else {
        Notice {
            style: NoticeStyle::Success,
            title: format!("Found {} duplicate groups", output.duplicate_count),
            message: format!("{} can be recovered", format_file_size(output.total_space)),
        }
    }
}
