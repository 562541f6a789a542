use super::preferences::{HashAlgorithm, Preferences};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

/// Per-scan options passed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub recursive: bool,
    pub algorithm: HashAlgorithm,
    /// Minimum file size in bytes. `None` and `Some(0)` both mean "no minimum".
    pub min_size: Option<u64>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            algorithm: HashAlgorithm::Sha256,
            min_size: None,
        }
    }
}

impl ScanOptions {
    /// Options for a scan started from the host's preferences.
    pub fn from_preferences(preferences: &Preferences) -> Self {
        Self {
            algorithm: preferences.algorithm,
            ..Self::default()
        }
    }
}

/// A complete engine report.
///
/// Field names follow the engine's JSON output; `duplicates` keeps the
/// engine's emission order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CliOutput {
    pub version: String,
    pub timestamp: DateTime<FixedOffset>,
    pub config: ConfigSnapshot,
    pub duplicate_count: u64,
    /// Bytes recoverable by keeping one file per group.
    pub total_space: u64,
    #[serde(deserialize_with = "null_as_empty")]
    pub duplicates: Vec<DuplicateGroup>,
}

/// Echo of the engine's effective configuration for the run.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ConfigSnapshot {
    pub dir: String,
    pub recursive: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub workers: u32,
    pub min_size: u64,
    pub interactive: bool,
    #[serde(rename = "TUI")]
    pub tui: bool,
    pub move_to: String,
    pub keep_criteria: String,
    pub hash_algorithm: String,
    pub file_pattern: String,
    pub export_report: bool,
    pub undo_last: bool,
    pub perceptual_mode: bool,
    #[serde(rename = "PHashAlgorithm")]
    pub phash_algorithm: String,
    pub similarity_threshold: f64,
    #[serde(rename = "JSON")]
    pub json: bool,
}

/// Files sharing one content fingerprint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DuplicateGroup {
    pub hash: String,
    pub size: u64,
    pub files: Vec<FileInfo>,
    /// 0-100, only meaningful in perceptual mode.
    #[serde(default)]
    pub similarity: f64,
}

impl DuplicateGroup {
    /// Bytes freed by keeping exactly one member.
    pub fn recoverable_bytes(&self) -> u64 {
        let extra = self.files.len().saturating_sub(1) as u64;
        self.size.saturating_mul(extra)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub hash: String,
    pub mod_time: DateTime<FixedOffset>,
    #[serde(rename = "PHash", default)]
    pub phash: Option<String>,
    /// Presenter-only selection flag. Never sent back to the engine.
    #[serde(default)]
    pub selected: Option<bool>,
}

impl FileInfo {
    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }
}

impl CliOutput {
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }

    /// Total number of files across all groups.
    pub fn file_count(&self) -> usize {
        self.duplicates.iter().map(|g| g.files.len()).sum()
    }

    pub fn find_group(&self, hash: &str) -> Option<&DuplicateGroup> {
        self.duplicates.iter().find(|g| g.hash == hash)
    }
}

// Go encodes an empty slice as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
