use crate::constants::{self, budget, env_vars};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod validation;

use paths::{get_config_path, get_log_dir_path};
use validation::validate_config;

/// Configuration structure for the pipeline.
/// Handles loading, saving, and managing settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the CFBD API. Should include the https:// prefix.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bearer token for the CFBD API. Usually supplied via `CFBD_API_KEY` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Monthly call allowance of the subscription tier.
    #[serde(default = "default_monthly_budget")]
    pub monthly_budget: u64,
    /// Location of the usage state file.
    #[serde(default = "default_state_file_path")]
    pub state_file_path: String,
    /// Root directory of the file warehouse.
    #[serde(default = "default_warehouse_dir")]
    pub warehouse_dir: String,
    /// Path to the log file. If not specified, logs go to the default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// HTTP timeout in seconds for API requests.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_api_base_url() -> String {
    constants::DEFAULT_API_BASE_URL.to_string()
}

fn default_monthly_budget() -> u64 {
    budget::DEFAULT_MONTHLY_BUDGET
}

fn default_state_file_path() -> String {
    budget::DEFAULT_STATE_FILE.to_string()
}

fn default_warehouse_dir() -> String {
    "warehouse".to_string()
}

/// Default HTTP timeout in seconds
fn default_http_timeout() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECONDS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: default_api_base_url(),
            api_key: None,
            monthly_budget: default_monthly_budget(),
            state_file_path: default_state_file_path(),
            warehouse_dir: default_warehouse_dir(),
            log_file_path: None,
            http_timeout_seconds: default_http_timeout(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file location.
    /// If no config file exists, defaults are used and nothing is written.
    /// Environment variables override config file values.
    ///
    /// # Environment Variables
    /// - `CFBD_API_KEY` - API key
    /// - `CFBD_API_BASE_URL` - Override API base URL
    /// - `CFBD_MONTHLY_BUDGET` - Override monthly call budget
    /// - `CFBD_STATE_FILE` - Override usage state file location
    /// - `CFBD_WAREHOUSE_DIR` - Override warehouse directory
    /// - `CFBD_HTTP_TIMEOUT` - Override HTTP timeout in seconds (default: 30)
    /// - `CFB_PIPELINE_LOG_FILE` - Override log file path
    pub async fn load() -> Result<Self, AppError> {
        let config_path = get_config_path();

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from_path(&config_path).await?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies `CFBD_*` environment overrides in place.
    /// Unparseable numeric values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var(env_vars::API_KEY) {
            self.api_key = Some(api_key);
        }

        if let Ok(base_url) = std::env::var(env_vars::API_BASE_URL) {
            self.api_base_url = base_url;
        }

        if let Some(budget) = std::env::var(env_vars::MONTHLY_BUDGET)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.monthly_budget = budget;
        }

        if let Ok(state_file) = std::env::var(env_vars::STATE_FILE) {
            self.state_file_path = state_file;
        }

        if let Ok(warehouse_dir) = std::env::var(env_vars::WAREHOUSE_DIR) {
            self.warehouse_dir = warehouse_dir;
        }

        if let Some(timeout) = std::env::var(env_vars::HTTP_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_seconds = timeout;
        }

        if let Ok(log_file_path) = std::env::var(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }
    }

    /// Validates the configuration settings
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(self)
    }

    /// Returns the API key, or a config error naming where to set it.
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(AppError::config_error(format!(
                "CFBD API key not found. Set {} or api_key in {}",
                env_vars::API_KEY,
                get_config_path()
            ))),
        }
    }

    /// Base URL with scheme enforced and no trailing slash.
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.api_base_url)
    }

    pub fn state_file(&self) -> PathBuf {
        PathBuf::from(&self.state_file_path)
    }

    pub fn warehouse_root(&self) -> PathBuf {
        PathBuf::from(&self.warehouse_dir)
    }

    /// Saves current configuration to the default config file location.
    pub async fn save(&self) -> Result<(), AppError> {
        let config_path = get_config_path();
        self.save_to_path(&config_path).await
    }

    /// Returns the platform-specific path for the config file.
    pub fn get_config_path() -> String {
        paths::get_config_path()
    }

    /// Returns the platform-specific path for the log directory.
    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Displays current configuration settings to stdout.
    /// The API key is masked.
    pub async fn display(&self) -> Result<(), AppError> {
        let config_path = get_config_path();
        let log_dir = get_log_dir_path();

        println!("\nCurrent Configuration");
        println!("────────────────────────────────────");
        println!("Config Location:");
        if Path::new(&config_path).exists() {
            println!("{config_path}");
        } else {
            println!("{config_path} (not created, using defaults)");
        }
        println!("────────────────────────────────────");
        println!("API Base URL:");
        println!("{}", self.api_base_url);
        println!("────────────────────────────────────");
        println!("API Key:");
        println!("{}", mask_api_key(self.api_key.as_deref()));
        println!("────────────────────────────────────");
        println!("Monthly Budget:");
        println!("{} calls", self.monthly_budget);
        println!("────────────────────────────────────");
        println!("State File:");
        println!("{}", self.state_file_path);
        println!("────────────────────────────────────");
        println!("Warehouse Directory:");
        println!("{}", self.warehouse_dir);
        println!("────────────────────────────────────");
        println!("HTTP Timeout:");
        println!("{} seconds", self.http_timeout_seconds);
        println!("────────────────────────────────────");
        println!("Log File Location:");
        if let Some(custom_path) = &self.log_file_path {
            println!("{custom_path}");
        } else {
            println!("{log_dir}/cfb_pipeline.log");
            println!("(Default location)");
        }

        Ok(())
    }

    /// Saves configuration to a custom file path.
    ///
    /// Creates the parent directory if it doesn't exist and normalizes the
    /// base URL to https://.
    ///
    /// # Errors
    /// * `AppError::Config` - If the provided path has no parent directory
    /// * `AppError::Io` - If there's an I/O error creating directories or writing the file
    /// * `AppError::TomlSerialize` - If there's an error serializing the configuration
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }

        let mut normalized = self.clone();
        normalized.api_base_url = normalize_base_url(&self.api_base_url);

        let content = toml::to_string_pretty(&normalized)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a custom file path without env overrides.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Ensures an https:// prefix and strips trailing slashes.
/// Plain http:// is kept for localhost so a local mock can be configured.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("https://")
        || trimmed.starts_with("http://localhost")
        || trimmed.starts_with("http://127.0.0.1")
    {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("http://"))
    }
}

fn mask_api_key(key: Option<&str>) -> String {
    match key {
        None => "(not set)".to_string(),
        Some(k) => {
            let len = k.chars().count();
            if len <= 4 {
                "****".to_string()
            } else {
                let tail: String = k.chars().skip(len - 4).collect();
                format!("****{tail}")
            }
        }
    }
}
