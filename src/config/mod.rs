use crate::models::Preferences;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat, Map};
use std::fs;

/// File name of the preferences document inside the config directory.
pub const PREFERENCES_FILE: &str = "preferences.yaml";

/// Prefix of environment overrides, e.g. `DEDUP_CLI_PATH`.
pub const ENV_PREFIX: &str = "DEDUP";

/// Loads and saves host [`Preferences`].
///
/// Values are layered: built-in defaults, then `preferences.yaml` (optional),
/// then `DEDUP_*` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    preferences_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `config_dir`, creating it if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            preferences_path: config_dir.join(PREFERENCES_FILE),
            config_dir,
        })
    }

    /// Load preferences from file and environment.
    pub fn load_preferences(&self) -> Result<Preferences> {
        self.load_layers(Some(env_source(None)))
    }

    /// Load preferences from the file only, ignoring the environment.
    pub fn load_preferences_file(&self) -> Result<Preferences> {
        self.load_layers(None)
    }

    /// Load preferences with `vars` standing in for the process environment.
    ///
    /// Keys use the same `DEDUP_*` form as real environment variables.
    pub fn load_preferences_with_vars<I, K, V>(&self, vars: I) -> Result<Preferences>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.load_layers(Some(env_source(Some(vars))))
    }

    fn load_layers(&self, env: Option<Environment>) -> Result<Preferences> {
        if !self.preferences_path.exists() {
            tracing::warn!(
                "Preferences file not found at {}, using defaults",
                self.preferences_path
            );
        }

        let mut builder = Config::builder().add_source(
            File::new(self.preferences_path.as_str(), FileFormat::Yaml).required(false),
        );
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let preferences: Preferences = builder
            .build()
            .with_context(|| format!("Failed to read preferences: {}", self.preferences_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse preferences: {}", self.preferences_path))?;

        tracing::info!(
            "Loaded preferences: engine={}, algorithm={}, default_location={:?}, timeout={}s",
            preferences.engine_path(),
            preferences.algorithm,
            preferences.default_location(),
            preferences.scan_timeout_secs
        );
        Ok(preferences)
    }

    /// Write preferences back to `preferences.yaml`.
    pub fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(preferences)
            .context("Failed to serialize preferences to YAML")?;

        fs::write(&self.preferences_path, yaml_string)
            .with_context(|| format!("Failed to write preferences: {}", self.preferences_path))?;

        tracing::info!("Saved preferences to {}", self.preferences_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn preferences_path(&self) -> &Utf8Path {
        &self.preferences_path
    }
}

/// `DEDUP_*` overrides, read from `vars` or from the process environment.
fn env_source(vars: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .source(vars)
}
