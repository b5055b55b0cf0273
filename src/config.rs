use std::path::{Path, PathBuf};

use compact_str::CompactString;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    client::config::DEFAULT_API_URL,
    result::{Result, StarsError},
};

const APP_DIR: &str = "awesome-stars";

/// Persistent host settings, stored as TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GitHub API base URL
    pub github_url: CompactString,
    /// Where the access token is kept; defaults under the user data dir
    pub storage_path: Option<PathBuf>,
    /// Log filter directive, e.g. `info` or `awesome_stars=debug`; `off` disables logging
    pub log_level: Option<CompactString>,
    /// Directory for rolling log files; defaults under the user data dir
    pub log_directory: Option<PathBuf>,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_url: DEFAULT_API_URL.into(),
            storage_path: None,
            log_level: None,
            log_directory: None,
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(StarsError::config_validation_error(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }

        crate::client::ClientConfig::from(self)
            .validate()
            .map_err(|e| StarsError::config_validation_error("github_url", e.to_string()))
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| data_dir().join("storage.json"))
    }

    pub fn log_directory(&self) -> PathBuf {
        self.log_directory
            .clone()
            .unwrap_or_else(|| data_dir().join("logs"))
    }
}

fn data_dir() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.data_local_dir().join(APP_DIR)
    } else {
        PathBuf::from(APP_DIR)
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("awesome-stars.toml")
    } else {
        PathBuf::from("awesome-stars.toml")
    }
}

/// Load the config file, creating it with defaults when missing
pub fn load_config(config_file: &Path) -> Result<AppConfig> {
    let config: AppConfig = confy::load_path(config_file)
        .map_err(|e| StarsError::config_load_error(config_file.to_path_buf(), e))?;
    config.validate()?;
    debug!(path = %config_file.display(), "Configuration loaded");
    Ok(config)
}

pub fn save_config(config_file: &Path, config: &AppConfig) -> Result<()> {
    confy::store_path(config_file, config)
        .map_err(|e| StarsError::config_save_error(config_file.to_path_buf(), e))?;

    Ok(())
}
