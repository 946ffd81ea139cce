//! Configuration infrastructure
//!
//! Settings are read from a JSON file under the user's config directory. Missing
//! sections fall back to the constants in [`defaults`], and a default file is written
//! on first run so it can be edited afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "artwork-harvester";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
}

/// Gallery crawling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Listing URL with a `{page}` placeholder
    pub listing_url_template: String,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Entries shown on one listing page
    pub page_size: u32,

    /// Number of artworks a run aims to cover
    pub max_items: u32,

    /// Download concurrency; `None` uses the available parallelism
    pub max_concurrent_downloads: Option<usize>,

    /// Where images are written
    pub directory: PathBuf,
}

/// Relational store locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bounding-box store ("paintings")
    pub paintings_database_url: String,

    /// Landmark store ("model")
    pub model_database_url: String,
}

/// External face-detection program run once after every crawl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Program to execute; the image directory is appended as the last argument
    pub command: Option<String>,

    /// Arguments placed before the directory
    pub args: Vec<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Override for the log directory (defaults to the app data directory)
    pub directory: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            listing_url_template: defaults::LISTING_URL_TEMPLATE.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            page_size: defaults::PAGE_SIZE,
            max_items: defaults::MAX_ITEMS,
            max_concurrent_downloads: None,
            directory: ConfigManager::get_app_data_dir()
                .map(|dir| dir.join(defaults::IMAGE_DIR_NAME))
                .unwrap_or_else(|_| PathBuf::from(defaults::IMAGE_DIR_NAME)),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = ConfigManager::get_app_data_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            paintings_database_url: sqlite_url(&data_dir.join(defaults::PAINTINGS_DB_FILE)),
            model_database_url: sqlite_url(&data_dir.join(defaults::MODEL_DB_FILE)),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_filters = HashMap::new();
        module_filters.insert("sqlx".to_string(), "warn".to_string());
        module_filters.insert("reqwest".to_string(), "info".to_string());
        module_filters.insert("hyper".to_string(), "warn".to_string());
        module_filters.insert("html5ever".to_string(), "warn".to_string());

        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            directory: None,
            module_filters,
        }
    }
}

impl CrawlerConfig {
    /// Concrete download concurrency, never zero
    pub fn download_concurrency(&self) -> usize {
        self.max_concurrent_downloads
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(1)
            })
            .max(1)
    }
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite:{}", path.display())
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(APP_DIR_NAME);
        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(APP_DIR_NAME);
        Ok(data_dir)
    }

    /// Manager for the default config file location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    /// Manager for an explicit config file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self { config_path: config_path.into() }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", self.config_path))?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("Configuration file is invalid: {}", parse_error);

                let backup_path = self.config_path.with_extension("json.corrupted");
                fs::copy(&self.config_path, &backup_path)
                    .await
                    .with_context(|| format!("Failed to back up corrupted config to {backup_path:?}"))?;
                warn!("Backed up corrupted config to {:?}, resetting to defaults", backup_path);

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory {parent:?}"))?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write configuration file {:?}", self.config_path))?;

        info!("Configuration saved to: {:?}", self.config_path);
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    /// Gallery listing page; `{page}` is replaced with the page number
    pub const LISTING_URL_TEMPLATE: &str = "https://artuk.org/discover/artworks/view_as/grid//page/{page}";

    /// Fixed browser User-Agent the gallery accepts
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.1 (KHTML, like Gecko) Chrome/22.0.1207.1 Safari/537.1";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

    /// Entries per listing page
    pub const PAGE_SIZE: u32 = 20;

    /// Default number of artworks a run aims to cover
    pub const MAX_ITEMS: u32 = 1000;

    /// Image directory name under the app data directory
    pub const IMAGE_DIR_NAME: &str = "paintings";

    /// SQLite file of the bounding-box store
    pub const PAINTINGS_DB_FILE: &str = "paintings.db";

    /// SQLite file of the landmark store
    pub const MODEL_DB_FILE: &str = "model.db";

    /// Config file name inside the config directory
    pub const CONFIG_FILE_NAME: &str = "config.json";

    /// Default log level
    pub const LOG_LEVEL: &str = "info";
}
