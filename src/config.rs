use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

static SETTINGS_FILE_NAME: &str = "settings.json";
static DEFAULT_SERVER_URL: &str = "https://api.ivy-apps.com";
static DEFAULT_LOG_LEVEL: &str = "info";

pub struct ProjectConfig {
    pub settings: Settings,
    pub project_dirs: ProjectDirs,
}

impl ProjectConfig {
    pub async fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "ivy", "ivy-sync")
            .ok_or_else(|| anyhow!("Failed to get project directories"))?;
        for x in [proj_dirs.config_dir(), proj_dirs.cache_dir(), proj_dirs.data_dir()] {
            if !x.exists() {
                fs::create_dir_all(x).context("Failed to create config directory")?;
            }
        }

        let settings = Settings::new(&proj_dirs.config_dir().join(SETTINGS_FILE_NAME)).await?;
        Ok(Self {
            settings,
            project_dirs: proj_dirs,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.project_dirs.data_dir().to_path_buf()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.project_dirs.config_dir().to_path_buf()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Base url of the Ivy backend
    pub server_url: String,
    pub sync_config: SyncConfig,
    /// Root log level: off, error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            sync_config: SyncConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    pub sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(300),
        }
    }
}

impl Settings {
    pub async fn new(config_file_path: &Path) -> Result<Self> {
        match Self::load_settings_from_file(config_file_path) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Error loading settings from file - creating default config: {}", e);
                let default = Self::default();
                default.save_to_file(config_file_path)?;
                Ok(default)
            }
        }
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| anyhow!("Invalid log level in settings: {}", self.log_level))
    }

    pub fn load_settings_from_file(config_file_path: &Path) -> Result<Self> {
        if !config_file_path.exists() {
            return Err(anyhow!("Config file not found"));
        }
        let data = fs::read_to_string(config_file_path)?;
        let settings: Self = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, config_file_path: &Path) -> Result<()> {
        if let Some(parent_path) = config_file_path.parent() {
            fs::create_dir_all(parent_path).context("Failed to create config directory")?;
        }

        let data = serde_json::to_string_pretty(self)?;
        fs::write(config_file_path, data)?;
        Ok(())
    }
}
