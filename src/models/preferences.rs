use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Engine binary name used when no explicit path is configured.
pub const DEFAULT_ENGINE: &str = "file-deduplicator";

/// Content hash used by the engine to fingerprint files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Md5,
    Sha1,
}

impl HashAlgorithm {
    /// Value passed to the engine's `--hash` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            other => Err(format!("unsupported hash algorithm: {other}")),
        }
    }
}

/// Host preferences, loaded from `preferences.yaml` and `DEDUP_*` variables.
///
/// These are passed explicitly into the invoker and controller rather than
/// read from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Path to the engine binary. Empty means "look up `file-deduplicator` on PATH".
    pub cli_path: String,

    /// Folder scanned automatically on start-up. Empty disables the auto-scan.
    pub default_scan_location: String,

    pub algorithm: HashAlgorithm,

    /// Include hidden files. The engine's command-line contract has no flag for
    /// this yet, so it is carried but not forwarded.
    pub show_hidden_files: bool,

    /// Deadline for a single engine run, in seconds. Zero (the default) leaves
    /// the engine to finish on its own.
    pub scan_timeout_secs: u64,

    pub debug_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            cli_path: String::new(),
            default_scan_location: String::new(),
            algorithm: HashAlgorithm::Sha256,
            show_hidden_files: false,
            scan_timeout_secs: 0,
            debug_mode: false,
        }
    }
}

impl Preferences {
    /// The engine executable to invoke.
    pub fn engine_path(&self) -> &str {
        if self.cli_path.trim().is_empty() {
            DEFAULT_ENGINE
        } else {
            &self.cli_path
        }
    }

    pub fn scan_deadline(&self) -> Option<Duration> {
        (self.scan_timeout_secs > 0).then(|| Duration::from_secs(self.scan_timeout_secs))
    }

    pub fn default_location(&self) -> Option<&str> {
        let location = self.default_scan_location.trim();
        (!location.is_empty()).then_some(location)
    }
}
