//! Configuration loading
//!
//! Tunables come from a YAML file (with defaults for every field); the three
//! API secrets come only from the environment.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ChatError;

/// Environment variable holding the language model API key
pub const LLM_API_KEY_VAR: &str = "GOOGLE_AI_API_KEY";
/// Environment variable holding the weather API key
pub const WEATHER_API_KEY_VAR: &str = "WEATHER_API_KEY";
/// Environment variable holding the news API key
pub const NEWS_API_KEY_VAR: &str = "NEWS_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_session_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            default_session_id: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_tool_rounds: u32,
    pub turn_timeout_ms: u64,
    /// Overrides the built-in assistant persona
    pub system_instruction: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: 60_000,
            max_tool_rounds: 5,
            turn_timeout_ms: 120_000,
            system_instruction: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub timeout_ms: u64,
    pub price_url: String,
    pub weather_url: String,
    pub news_url: String,
    pub news_page_size: u32,
    /// Lowercase place name -> name sent upstream
    pub location_aliases: HashMap<String, String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let mut location_aliases = HashMap::new();
        location_aliases.insert("prayagraj".to_string(), "allahabad".to_string());

        Self {
            timeout_ms: 15_000,
            price_url: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            weather_url: "http://api.weatherapi.com/v1/current.json".to_string(),
            news_url: "https://newsapi.org/v2/top-headlines".to_string(),
            news_page_size: 5,
            location_aliases,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            tools: ToolsConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        Self::load_first_existing(&Self::search_paths())
    }

    /// `<config_dir>/<project>/<project>.yml`, then `./<project>.yml`
    fn search_paths() -> Vec<PathBuf> {
        let project_name = env!("CARGO_PKG_NAME");
        let file_name = format!("{}.yml", project_name);

        let mut paths = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(project_name).join(&file_name));
        }
        paths.push(PathBuf::from(file_name));
        paths
    }

    /// Load the first candidate that exists. A file that exists but cannot
    /// be read or parsed is an error, never skipped.
    pub fn load_first_existing(candidates: &[PathBuf]) -> Result<Self> {
        for path in candidates {
            if path.exists() {
                return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ChatError> {
        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `PORT` from the environment, as hosting platforms expect
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .context(format!("PORT must be a valid port number, got '{}'", port))?;
        }
        Ok(())
    }
}

/// API secrets required at startup
#[derive(Clone)]
pub struct Secrets {
    pub llm_api_key: String,
    pub weather_api_key: String,
    pub news_api_key: String,
}

impl Secrets {
    /// Read all secrets from the process environment
    pub fn from_env() -> std::result::Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read all secrets through `lookup`; every missing or blank key is reported at once
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut fetch = |key: &str| match lookup(key) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let llm_api_key = fetch(LLM_API_KEY_VAR);
        let weather_api_key = fetch(WEATHER_API_KEY_VAR);
        let news_api_key = fetch(NEWS_API_KEY_VAR);

        if !missing.is_empty() {
            return Err(ChatError::MissingSecrets(missing));
        }

        Ok(Self {
            llm_api_key,
            weather_api_key,
            news_api_key,
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}
