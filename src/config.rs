//! Configuration file handling.
//!
//! Values come from `config.toml` in the platform config directory (or the
//! `--config` path), with command-line flags layered on top. A missing file
//! simply means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::db::{data_dirs, default_db_path};
use crate::search::{results_url, PickerConfig};

const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "setlist-search.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site hosting the results endpoint.
    pub base_url: String,
    pub results_path: String,
    /// Song catalog location. Defaults to the platform data directory.
    pub database: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Maximum number of picker matches fetched per keystroke.
    pub search_limit: usize,
    pub picker: PickerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://databruce.com".to_string(),
            results_path: "/advanced_search/results".to_string(),
            database: None,
            log_filter: "info".to_string(),
            search_limit: 50,
            picker: PickerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerSettings {
    pub min_input_length: usize,
    pub placeholder: String,
    pub allow_clear: bool,
    pub theme: String,
}

impl Default for PickerSettings {
    fn default() -> Self {
        let defaults = PickerConfig::default();
        Self {
            min_input_length: defaults.min_input_length,
            placeholder: defaults.placeholder,
            allow_clear: defaults.allow_clear,
            theme: defaults.theme,
        }
    }
}

impl From<&PickerSettings> for PickerConfig {
    fn from(settings: &PickerSettings) -> Self {
        PickerConfig {
            min_input_length: settings.min_input_length,
            placeholder: settings.placeholder.clone(),
            allow_clear: settings.allow_clear,
            theme: settings.theme.clone(),
        }
    }
}

impl Config {
    /// Load from `explicit` if given (which must exist), otherwise from the
    /// default location if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        results_url(&self.base_url, &self.results_path)?;
        Ok(())
    }

    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        base_url: Option<String>,
    ) -> Result<Self> {
        if let Some(database) = database {
            self.database = Some(database);
        }
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }

    pub fn results_url(&self) -> Result<String> {
        results_url(&self.base_url, &self.results_path)
    }

    pub fn picker_config(&self) -> PickerConfig {
        PickerConfig::from(&self.picker)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(data_dirs()?.config_dir().join(CONFIG_FILE_NAME))
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(data_dirs()?.data_dir().join(LOG_FILE_NAME))
}
