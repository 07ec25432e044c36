//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::Result;
use crate::error::Error;

/// Environment variable consulted when `api_key` is empty
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible chat completions API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key; falls back to `OPENAI_API_KEY` when empty
    #[serde(default)]
    pub api_key: String,

    /// Maximum tool iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Timeout applied to every outgoing HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Gmail tool configuration
    #[serde(default)]
    pub gmail: GmailConfig,
}

/// Locations of the Gmail OAuth files, relative to the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    /// OAuth client secret downloaded from the Google Cloud console
    #[serde(default = "default_client_secret_path")]
    pub client_secret_path: PathBuf,

    /// Where the authorized token is persisted
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

fn default_model() -> String {
    "gpt-5-nano".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_iterations() -> usize {
    20
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_client_secret_path() -> PathBuf {
    PathBuf::from("secrets").join("gcloud_desktop_credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            client_secret_path: default_client_secret_path(),
            token_path: default_token_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key: String::new(),
            max_iterations: default_max_iterations(),
            request_timeout_secs: default_request_timeout_secs(),
            gmail: GmailConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the API key from config or environment
    pub fn resolved_api_key(&self) -> Result<String> {
        if !self.api_key.is_empty() {
            return Ok(self.api_key.clone());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config(format!(
                "No API key configured. Set \"api_key\" in {:?} or export {}",
                config_path(),
                API_KEY_ENV
            )))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".courier")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from file, falling back to defaults when absent
pub fn load() -> Result<Config> {
    let path = config_path();

    if !path.exists() {
        tracing::debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config at {:?}: {}", path, e)))?;
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    let path = config_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}
