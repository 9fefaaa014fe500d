//! Configuration management and validation.
//!
//! Provides the store location and the import settings, loadable from a JSON
//! file and overridable from the command line.

use crate::constants::{DEFAULT_MISSING_VALUES, DEFAULT_STORE_DIR, DEFAULT_STORE_FILE};
use crate::error::{MudataError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Datum values treated as absent
    pub missing_values: Vec<String>,

    /// Show a progress bar while data rows are imported
    pub show_progress: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            missing_values: DEFAULT_MISSING_VALUES
                .iter()
                .map(|v| v.to_string())
                .collect(),
            show_progress: true,
        }
    }
}

impl ImportConfig {
    pub fn is_missing_value(&self, value: &str) -> bool {
        self.missing_values.iter().any(|m| m == value)
    }

    pub fn with_missing_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }
}

/// Main configuration for mudata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MudataConfig {
    /// JSON snapshot holding the entity store
    pub store_path: PathBuf,

    pub import: ImportConfig,
}

impl Default for MudataConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            import: ImportConfig::default(),
        }
    }
}

/// `<data_dir>/mudata/store.json`, or the working directory when no data
/// directory is known
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_STORE_DIR)
        .join(DEFAULT_STORE_FILE)
}

impl MudataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file; fields it omits keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            MudataError::configuration(format!(
                "cannot read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(MudataError::configuration("store path must not be empty"));
        }
        Ok(())
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_import(mut self, import: ImportConfig) -> Self {
        self.import = import;
        self
    }
}
