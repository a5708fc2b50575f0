use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name used under the platform data directory
const DATA_DIR_NAME: &str = "TaskDeskData";

/// User configuration, read from `config.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the data files live; falls back to [`default_data_dir`]
    pub data_dir: Option<PathBuf>,

    /// Seed an Admin account when the users file holds nobody
    pub bootstrap_admin: bool,

    /// Log filter, e.g. "info" or "taskdesk_core=debug"
    pub log_level: String,

    pub log_to_file: bool,

    /// bcrypt cost for new password hashes
    pub password_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            bootstrap_admin: true,
            log_level: "info".to_string(),
            log_to_file: true,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the configuration, using defaults if the file doesn't exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Effective data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Directory for log files
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }
}

/// Gets the config file path from the environment or the default location
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TASKDESK_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
    Ok(config_dir.join("taskdesk").join("config.yaml"))
}

/// Default data directory, overridable with `TASKDESK_DATA_DIR`
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("TASKDESK_DATA_DIR") {
        return PathBuf::from(path);
    }

    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(DATA_DIR_NAME))
}
